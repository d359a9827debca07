//! Morse text entry driven by classified gaze events

use crate::domain::types::{EventKind, GazeEvent, GazeSymbol, MorseAction};
use smallvec::SmallVec;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Six dots: clears both the pending buffer and the decoded text
const CLEAR_ALL_CODE: &str = "......";

/// ITU Morse table, A-Z and 0-9
fn morse_to_char(code: &str) -> Option<char> {
    let c = match code {
        ".-" => 'A',
        "-..." => 'B',
        "-.-." => 'C',
        "-.." => 'D',
        "." => 'E',
        "..-." => 'F',
        "--." => 'G',
        "...." => 'H',
        ".." => 'I',
        ".---" => 'J',
        "-.-" => 'K',
        ".-.." => 'L',
        "--" => 'M',
        "-." => 'N',
        "---" => 'O',
        ".--." => 'P',
        "--.-" => 'Q',
        ".-." => 'R',
        "..." => 'S',
        "-" => 'T',
        "..-" => 'U',
        "...-" => 'V',
        ".--" => 'W',
        "-..-" => 'X',
        "-.--" => 'Y',
        "--.." => 'Z',
        "-----" => '0',
        ".----" => '1',
        "..---" => '2',
        "...--" => '3',
        "....-" => '4',
        "....." => '5',
        "-...." => '6',
        "--..." => '7',
        "---.." => '8',
        "----." => '9',
        _ => return None,
    };
    Some(c)
}

/// Decodes the gaze event stream into text while a Morse step is active.
///
/// Quick UP appends a dot, quick DOWN a dash. Long NEUTRAL commits the
/// pending buffer as one character at the first threshold and submits the
/// whole text at the second; the hold tracker delivers those as two
/// separate long events for one sustained run, so each fires exactly once.
/// Long UP inserts a space, long DOWN clears the pending buffer or, when
/// it is already empty, deletes the last decoded character.
pub struct MorseDecoder {
    submit_threshold: Duration,
    active: bool,
    pending: String,
    text: String,
}

impl MorseDecoder {
    pub fn new(submit_threshold: Duration) -> Self {
        Self { submit_threshold, active: false, pending: String::new(), text: String::new() }
    }

    /// Begin a text-entry session with empty buffers
    pub fn activate(&mut self) {
        self.active = true;
        self.pending.clear();
        self.text.clear();
        info!("morse_activated");
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Feed one classified gaze event; inert while inactive.
    pub fn on_event(&mut self, event: &GazeEvent) -> SmallVec<[MorseAction; 2]> {
        let mut actions = SmallVec::new();
        if !self.active {
            return actions;
        }

        match (event.kind, event.symbol) {
            (EventKind::Quick, GazeSymbol::Up) => {
                self.pending.push('.');
                actions.push(MorseAction::Symbol('.'));
            }
            (EventKind::Quick, GazeSymbol::Down) => {
                self.pending.push('-');
                actions.push(MorseAction::Symbol('-'));
            }
            (EventKind::Quick, GazeSymbol::Neutral) => {}
            // Directional holds act once, at the first threshold crossing;
            // later crossings of the same run arrive with longer durations.
            (EventKind::Long, GazeSymbol::Up) if event.duration < self.submit_threshold => {
                self.pending.clear();
                self.text.push(' ');
                actions.push(MorseAction::Space);
            }
            (EventKind::Long, GazeSymbol::Up) => {}
            (EventKind::Long, GazeSymbol::Down) if event.duration >= self.submit_threshold => {}
            (EventKind::Long, GazeSymbol::Down) => {
                if !self.pending.is_empty() {
                    self.pending.clear();
                    actions.push(MorseAction::ClearPending);
                } else if self.text.pop().is_some() {
                    actions.push(MorseAction::Backspace);
                }
            }
            (EventKind::Long, GazeSymbol::Neutral) => {
                if event.duration >= self.submit_threshold {
                    if let Some(commit) = self.commit_pending() {
                        actions.push(commit);
                    }
                    info!(text = %self.text, "morse_submitted");
                    self.active = false;
                    actions.push(MorseAction::Submit(self.text.clone()));
                } else if let Some(commit) = self.commit_pending() {
                    actions.push(commit);
                }
            }
        }

        if let Some(action) = actions.last() {
            debug!(
                action = %action.as_str(),
                pending = %self.pending,
                text_len = %self.text.len(),
                "morse_action"
            );
        }
        actions
    }

    fn commit_pending(&mut self) -> Option<MorseAction> {
        if self.pending.is_empty() {
            return None;
        }
        let code = std::mem::take(&mut self.pending);
        if code == CLEAR_ALL_CODE {
            self.text.clear();
            return Some(MorseAction::ClearAll);
        }
        match morse_to_char(&code) {
            Some(c) => {
                self.text.push(c);
                Some(MorseAction::Letter(c))
            }
            None => {
                warn!(code = %code, "morse_unmapped_symbol");
                self.text.push('?');
                Some(MorseAction::Unmapped(code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const LETTER: Duration = Duration::from_secs(1);
    const SUBMIT: Duration = Duration::from_secs(3);

    fn decoder() -> MorseDecoder {
        let mut d = MorseDecoder::new(SUBMIT);
        d.activate();
        d
    }

    fn quick(symbol: GazeSymbol) -> GazeEvent {
        GazeEvent::quick(symbol, Instant::now(), Duration::from_millis(300))
    }

    fn long(symbol: GazeSymbol, duration: Duration) -> GazeEvent {
        GazeEvent::long(symbol, Instant::now(), duration)
    }

    fn tap(d: &mut MorseDecoder, code: &str) {
        for ch in code.chars() {
            let symbol = if ch == '.' { GazeSymbol::Up } else { GazeSymbol::Down };
            d.on_event(&quick(symbol));
        }
    }

    #[test]
    fn test_dot_dash_and_letter_commit() {
        let mut d = decoder();

        let a = d.on_event(&quick(GazeSymbol::Up));
        assert_eq!(a.as_slice(), &[MorseAction::Symbol('.')]);
        let a = d.on_event(&quick(GazeSymbol::Down));
        assert_eq!(a.as_slice(), &[MorseAction::Symbol('-')]);
        assert_eq!(d.pending(), ".-");

        let a = d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(a.as_slice(), &[MorseAction::Letter('A')]);
        assert_eq!(d.text(), "A");
        assert_eq!(d.pending(), "");
    }

    #[test]
    fn test_commit_with_empty_pending_is_noop() {
        let mut d = decoder();
        assert!(d.on_event(&long(GazeSymbol::Neutral, LETTER)).is_empty());
        assert_eq!(d.text(), "");
    }

    #[test]
    fn test_unmapped_code_appends_placeholder() {
        let mut d = decoder();
        tap(&mut d, ".......");
        let a = d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(a.as_slice(), &[MorseAction::Unmapped(".......".into())]);
        assert_eq!(d.text(), "?");
    }

    #[test]
    fn test_space_and_backspace() {
        let mut d = decoder();
        tap(&mut d, "...");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(d.text(), "S");

        let a = d.on_event(&long(GazeSymbol::Up, LETTER));
        assert_eq!(a.as_slice(), &[MorseAction::Space]);
        assert_eq!(d.text(), "S ");

        // Pending empty, so long DOWN deletes the trailing space
        let a = d.on_event(&long(GazeSymbol::Down, LETTER));
        assert_eq!(a.as_slice(), &[MorseAction::Backspace]);
        assert_eq!(d.text(), "S");
    }

    #[test]
    fn test_long_down_clears_pending_before_backspacing() {
        let mut d = decoder();
        tap(&mut d, "...");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        tap(&mut d, "--");

        let a = d.on_event(&long(GazeSymbol::Down, LETTER));
        assert_eq!(a.as_slice(), &[MorseAction::ClearPending]);
        assert_eq!(d.pending(), "");
        // Text untouched; only a second long DOWN backspaces
        assert_eq!(d.text(), "S");
    }

    #[test]
    fn test_repeat_crossings_of_one_hold_act_once() {
        let mut d = decoder();
        tap(&mut d, "...");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        d.on_event(&long(GazeSymbol::Up, LETTER));
        assert_eq!(d.text(), "S ");

        // The same UP run crossing the next threshold is inert
        assert!(d.on_event(&long(GazeSymbol::Up, SUBMIT)).is_empty());
        assert_eq!(d.text(), "S ");
        assert!(d.on_event(&long(GazeSymbol::Down, SUBMIT)).is_empty());
    }

    #[test]
    fn test_backspace_on_empty_text_is_noop() {
        let mut d = decoder();
        assert!(d.on_event(&long(GazeSymbol::Down, LETTER)).is_empty());
    }

    #[test]
    fn test_six_dots_clears_everything() {
        let mut d = decoder();
        tap(&mut d, "...");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(d.text(), "S");

        tap(&mut d, "......");
        let a = d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(a.as_slice(), &[MorseAction::ClearAll]);
        assert_eq!(d.text(), "");
        assert_eq!(d.pending(), "");
    }

    #[test]
    fn test_submit_finalizes_and_deactivates() {
        let mut d = decoder();
        tap(&mut d, ".-");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        tap(&mut d, "-");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(d.text(), "AT");

        // One sustained neutral run: commit at 1s already happened, the 3s
        // crossing arrives as its own event
        let a = d.on_event(&long(GazeSymbol::Neutral, SUBMIT));
        assert_eq!(a.as_slice(), &[MorseAction::Submit("AT".into())]);
        assert!(!d.is_active());

        // Inactive decoder ignores everything
        assert!(d.on_event(&quick(GazeSymbol::Up)).is_empty());
    }

    #[test]
    fn test_submit_commits_outstanding_pending() {
        let mut d = decoder();
        tap(&mut d, "-");
        let a = d.on_event(&long(GazeSymbol::Neutral, SUBMIT));
        assert_eq!(
            a.as_slice(),
            &[MorseAction::Letter('T'), MorseAction::Submit("T".into())]
        );
    }

    #[test]
    fn test_inactive_by_default() {
        let mut d = MorseDecoder::new(SUBMIT);
        assert!(!d.is_active());
        assert!(d.on_event(&quick(GazeSymbol::Up)).is_empty());
    }

    #[test]
    fn test_digits_decode() {
        let mut d = decoder();
        tap(&mut d, ".----");
        d.on_event(&long(GazeSymbol::Neutral, LETTER));
        assert_eq!(d.text(), "1");
    }
}
