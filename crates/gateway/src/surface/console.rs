//! Terminal surface used by `streamrelay ask`.
//!
//! Card updates always carry the whole answer so far; the console prints
//! only the part it has not printed yet.

use std::io::Write;

use parking_lot::Mutex;

use sr_domain::error::Result;

use super::{CardContent, CardStage, CardSurface, ReplyTarget};

#[derive(Default)]
pub struct ConsoleSurface {
    printed: Mutex<String>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the printed prefix to `text` and return what is new.
    /// Renders that are not an extension of what is already on screen are
    /// ignored.
    fn advance(&self, text: &str) -> Option<String> {
        let mut printed = self.printed.lock();
        let suffix = text.strip_prefix(printed.as_str())?;
        if suffix.is_empty() {
            return None;
        }
        let suffix = suffix.to_owned();
        printed.push_str(&suffix);
        Some(suffix)
    }
}

#[async_trait::async_trait]
impl CardSurface for ConsoleSurface {
    async fn send_card(&self, card_id: &str, _reply: &ReplyTarget) -> Result<()> {
        tracing::debug!(card_id, "console card opened");
        self.printed.lock().clear();
        Ok(())
    }

    async fn update_card(&self, _card_id: &str, content: &CardContent) -> Result<()> {
        match content.stage {
            CardStage::Streaming | CardStage::Final => {
                let mut stdout = std::io::stdout().lock();
                if let Some(chunk) = self.advance(&content.text) {
                    write!(stdout, "{chunk}")?;
                }
                if content.stage == CardStage::Final {
                    writeln!(stdout)?;
                }
                stdout.flush()?;
            }
            CardStage::Failed => eprintln!("\nerror: {}", content.text),
        }
        Ok(())
    }

    async fn reply_text(&self, _reply: &ReplyTarget, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }

    async fn reply_markdown(&self, _reply: &ReplyTarget, title: &str, text: &str) -> Result<()> {
        println!("# {title}\n{text}");
        Ok(())
    }
}
