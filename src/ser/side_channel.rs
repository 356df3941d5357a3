use crate::error::{Error, Result};
use crate::value::Value;

/// Call-local identity table for cycle detection.
///
/// Tracks the containers on the active traversal path by address.
/// Lookup is by identity, never by value equality, and entries are
/// removed as frames return, so nothing outlives the encode call and
/// no input container is retained.
pub(crate) struct SideChannel {
    frames: Vec<*const Value>,
}

impl SideChannel {
    pub(crate) fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Mark `value` as being traversed, failing if it is already on
    /// the active path.
    pub(crate) fn enter(&mut self, value: &Value) -> Result<()> {
        let identity = value as *const Value;
        if self.frames.contains(&identity) {
            return Err(Error::CircularReference);
        }
        self.frames.push(identity);
        Ok(())
    }

    /// Release the most recent frame.
    pub(crate) fn exit(&mut self) {
        self.frames.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_entering_the_same_container_fails() {
        let value = Value::Seq(vec![]);
        let mut channel = SideChannel::new();
        channel.enter(&value).unwrap();
        let err = channel.enter(&value).unwrap_err();
        assert_eq!(err.to_string(), "Circular reference detected");
    }

    #[test]
    fn identity_is_per_address_not_per_value() {
        let a = Value::Seq(vec![]);
        let b = Value::Seq(vec![]);
        let mut channel = SideChannel::new();
        channel.enter(&a).unwrap();
        // equal values at different addresses are distinct containers
        channel.enter(&b).unwrap();
    }

    #[test]
    fn exiting_releases_the_frame() {
        let value = Value::Seq(vec![]);
        let mut channel = SideChannel::new();
        channel.enter(&value).unwrap();
        channel.exit();
        channel.enter(&value).unwrap();
    }
}
