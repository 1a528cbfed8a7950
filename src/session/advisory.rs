//! Non-fatal, user-facing notices raised while starting a session.

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// A render device's multichannel layout cannot be captured; the channel was left out.
    UnsupportedFormat {
        channel: String,
        device: String,
        channels: u16,
    },
    /// No enabled channel resolved to a device that could be started.
    NothingToRecord,
}

impl Advisory {
    pub fn message(&self) -> String {
        match self {
            Advisory::UnsupportedFormat {
                device, channels, ..
            } => format!(
                "Failed to start recording from {device}.\n\
                 This device uses a {channels}-channel format, which is not supported. You may:\n\
                 \x20 1) enable a stereo mix / monitor capture device, or\n\
                 \x20 2) switch {device} to a stereo rather than a surround format."
            ),
            Advisory::NothingToRecord => "Either no channels are enabled or none of the \
                 associated devices are ready. No recording has been started."
                .to_string(),
        }
    }
}

/// Receives advisories; the session never blocks on them.
pub trait AdvisorySink {
    fn advise(&self, advisory: &Advisory);
}

/// Default sink: logs each advisory.
pub struct LogAdvisories;

impl AdvisorySink for LogAdvisories {
    fn advise(&self, advisory: &Advisory) {
        warn!("{}", advisory.message());
    }
}

impl<F: Fn(&Advisory)> AdvisorySink for F {
    fn advise(&self, advisory: &Advisory) {
        self(advisory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_message_names_device_and_channels() {
        let advisory = Advisory::UnsupportedFormat {
            channel: "Desktop".to_string(),
            device: "Speakers".to_string(),
            channels: 6,
        };
        let message = advisory.message();
        assert!(message.contains("Speakers"));
        assert!(message.contains("6-channel"));
    }

    #[test]
    fn test_closure_sink() {
        let seen = std::cell::RefCell::new(Vec::new());
        let sink = |a: &Advisory| seen.borrow_mut().push(a.clone());
        sink.advise(&Advisory::NothingToRecord);
        assert_eq!(seen.borrow().as_slice(), &[Advisory::NothingToRecord]);
    }
}
