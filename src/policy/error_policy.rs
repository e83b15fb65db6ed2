use std::fmt;

/// ErrorClass groups run-time and setup faults by where they originate.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ErrorClass {
    /// Setup covers stream address parsing, session start, store
    /// connect and ping.
    Setup,

    /// OutOfBounds is a packet whose track index has no gate slot.
    OutOfBounds,

    /// MalformedPacket is a sampled packet with a missing or undersized
    /// send-time extension.
    MalformedPacket,

    /// StoreWrite is a rejected or timed out insert.
    StoreWrite,
}

const ERROR_CLASS_SETUP_STR: &str = "setup";
const ERROR_CLASS_OUT_OF_BOUNDS_STR: &str = "out-of-bounds";
const ERROR_CLASS_MALFORMED_PACKET_STR: &str = "malformed-packet";
const ERROR_CLASS_STORE_WRITE_STR: &str = "store-write";

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ErrorClass::Setup => ERROR_CLASS_SETUP_STR,
            ErrorClass::OutOfBounds => ERROR_CLASS_OUT_OF_BOUNDS_STR,
            ErrorClass::MalformedPacket => ERROR_CLASS_MALFORMED_PACKET_STR,
            ErrorClass::StoreWrite => ERROR_CLASS_STORE_WRITE_STR,
        };
        write!(f, "{s}")
    }
}

/// FaultAction is what the sampler does with an error of a given class.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum FaultAction {
    /// Fatal stops the session and surfaces the error to the caller.
    Fatal,
    /// Skip logs the error, counts it and keeps sampling.
    Skip,
}

impl Default for FaultAction {
    fn default() -> Self {
        FaultAction::Fatal
    }
}

impl fmt::Display for FaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FaultAction::Fatal => write!(f, "fatal"),
            FaultAction::Skip => write!(f, "skip"),
        }
    }
}

/// ErrorPolicy is the table mapping every ErrorClass to a FaultAction.
///
/// Setup errors are always fatal: they happen before sampling starts and
/// leave nothing to continue with.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ErrorPolicy {
    pub out_of_bounds: FaultAction,
    pub malformed_packet: FaultAction,
    pub store_write: FaultAction,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::strict()
    }
}

impl ErrorPolicy {
    /// strict treats every fault as fatal.
    pub fn strict() -> Self {
        ErrorPolicy {
            out_of_bounds: FaultAction::Fatal,
            malformed_packet: FaultAction::Fatal,
            store_write: FaultAction::Fatal,
        }
    }

    /// tolerant drops malformed packets and failed writes but keeps
    /// out-of-bounds track indices fatal.
    pub fn tolerant() -> Self {
        ErrorPolicy {
            out_of_bounds: FaultAction::Fatal,
            malformed_packet: FaultAction::Skip,
            store_write: FaultAction::Skip,
        }
    }

    pub fn with_action(mut self, class: ErrorClass, action: FaultAction) -> Self {
        match class {
            ErrorClass::Setup => {
                log::warn!("setup errors are always fatal, ignoring {action}");
            }
            ErrorClass::OutOfBounds => self.out_of_bounds = action,
            ErrorClass::MalformedPacket => self.malformed_packet = action,
            ErrorClass::StoreWrite => self.store_write = action,
        }
        self
    }

    pub fn action(&self, class: ErrorClass) -> FaultAction {
        match class {
            ErrorClass::Setup => FaultAction::Fatal,
            ErrorClass::OutOfBounds => self.out_of_bounds,
            ErrorClass::MalformedPacket => self.malformed_packet,
            ErrorClass::StoreWrite => self.store_write,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_class_string() {
        let tests = vec![
            (ErrorClass::Setup, "setup"),
            (ErrorClass::OutOfBounds, "out-of-bounds"),
            (ErrorClass::MalformedPacket, "malformed-packet"),
            (ErrorClass::StoreWrite, "store-write"),
        ];

        for (class, expected_string) in tests {
            assert_eq!(expected_string, class.to_string());
        }
    }

    #[test]
    fn test_error_policy_tables() {
        let tests = vec![
            (ErrorPolicy::strict(), ErrorClass::Setup, FaultAction::Fatal),
            (ErrorPolicy::strict(), ErrorClass::OutOfBounds, FaultAction::Fatal),
            (ErrorPolicy::strict(), ErrorClass::MalformedPacket, FaultAction::Fatal),
            (ErrorPolicy::strict(), ErrorClass::StoreWrite, FaultAction::Fatal),
            (ErrorPolicy::tolerant(), ErrorClass::Setup, FaultAction::Fatal),
            (ErrorPolicy::tolerant(), ErrorClass::OutOfBounds, FaultAction::Fatal),
            (ErrorPolicy::tolerant(), ErrorClass::MalformedPacket, FaultAction::Skip),
            (ErrorPolicy::tolerant(), ErrorClass::StoreWrite, FaultAction::Skip),
        ];

        for (policy, class, expected) in tests {
            assert_eq!(expected, policy.action(class), "{class}");
        }
    }

    #[test]
    fn test_error_policy_setup_stays_fatal() {
        let policy = ErrorPolicy::tolerant()
            .with_action(ErrorClass::Setup, FaultAction::Skip)
            .with_action(ErrorClass::OutOfBounds, FaultAction::Skip);

        assert_eq!(FaultAction::Fatal, policy.action(ErrorClass::Setup));
        assert_eq!(FaultAction::Skip, policy.action(ErrorClass::OutOfBounds));
        assert_eq!(ErrorPolicy::strict(), ErrorPolicy::default());
    }
}
