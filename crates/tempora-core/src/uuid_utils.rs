//! UUIDv7 helpers.
//!
//! All tempora primary keys are UUIDv7: time-ordered, so index locality
//! follows insertion order and ids sort by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 for the current time.
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Whether a UUID is version 7.
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_v7_is_version_7() {
        assert!(is_v7(&new_v7()));
        assert!(!is_v7(&Uuid::new_v4()));
    }

    #[test]
    fn new_v7_sorts_by_creation() {
        let a = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_v7();
        assert!(a < b);
    }
}
