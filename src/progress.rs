use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

// The last entry is the finished frame.
const FRAMES: [&str; 7] = ["=", "==", "===", "====", "======", "=======", ""];
const FRAME_INTERVAL: Duration = Duration::from_millis(150);

pub struct ProgressIndicator {
    bar: ProgressBar,
}

impl ProgressIndicator {
    pub fn start(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(ProgressStyle::default_spinner().tick_strings(&FRAMES));
        bar.enable_steady_tick(FRAME_INTERVAL);
        Self { bar }
    }

    pub fn stop(self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}


#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::ProgressIndicator;
    use super::testing::{terminal, wait_for_frame};

    #[test]
    fn draws_frames_until_stopped_then_clears() {
        let term = terminal();
        let indicator = ProgressIndicator::start(ProgressDrawTarget::term_like(Box::new(term.clone())));

        let frame = wait_for_frame(&term);
        assert!(frame.trim().starts_with('='), "unexpected frame: {frame:?}");

        indicator.stop();
        assert_eq!(term.contents().trim(), "");
    }

    #[test]
    fn dropping_clears_the_line() {
        let term = terminal();
        let indicator = ProgressIndicator::start(ProgressDrawTarget::term_like(Box::new(term.clone())));
        wait_for_frame(&term);

        drop(indicator);
        assert_eq!(term.contents().trim(), "");
    }
}
