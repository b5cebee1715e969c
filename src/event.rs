//! Module: event
//!
//! Purpose: MorseEvent, the only value that crosses from the classifier
//! to the encoder.
//!
//! Architecture:
//! - Closed sum type, copied by value, no identity beyond its tag
//! - One byte wide so the event channel stays small in SRAM
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// A symbolic event produced by the classifier.
///
/// The encoder matches on this exhaustively, so adding a variant forces
/// every transition in the line formatter to be revisited.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MorseEvent {
    /// Short symbol, rendered as `.`
    Dot = 0,
    /// Long symbol, rendered as `-`
    Dash = 1,
    /// Separator between letters, one space
    GapLetter = 2,
    /// Separator between words, two spaces
    GapWord = 3,
    /// Close the current line with `"  \n"` and flush it
    EndMessage = 4,
}

impl MorseEvent {
    /// Placeholder used to initialise channel slots. Never observed by a
    /// consumer because slots are only read after being written.
    pub const EMPTY: Self = MorseEvent::GapLetter;

    /// The symbol byte for Dot/Dash, `None` for separators.
    #[inline]
    pub const fn symbol(self) -> Option<u8> {
        match self {
            MorseEvent::Dot => Some(b'.'),
            MorseEvent::Dash => Some(b'-'),
            _ => None,
        }
    }

    /// True for the two symbol events.
    #[inline]
    pub const fn is_symbol(self) -> bool {
        matches!(self, MorseEvent::Dot | MorseEvent::Dash)
    }

    /// Short name used in log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            MorseEvent::Dot => "DOT",
            MorseEvent::Dash => "DASH",
            MorseEvent::GapLetter => "GAP_LETTER",
            MorseEvent::GapWord => "GAP_WORD",
            MorseEvent::EndMessage => "END_MSG",
        }
    }

    /// Map a released press count to its gap event.
    ///
    /// 1 press closes a letter, 2 close a word, 3 end the message.
    /// Anything else is not a gesture.
    pub const fn from_press_count(count: u8) -> Option<Self> {
        match count {
            1 => Some(MorseEvent::GapLetter),
            2 => Some(MorseEvent::GapWord),
            3 => Some(MorseEvent::EndMessage),
            _ => None,
        }
    }
}

impl core::fmt::Display for MorseEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
