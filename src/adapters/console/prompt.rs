//! Operator input and approval prompts.
//!
//! Stdin is read by one task and fanned into a channel. The REPL and
//! the approval prompt both pull from it, so a signature prompt shown
//! mid-command reads the operator's next line.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::ports::wallet::{ApprovalRequest, SignatureApproval};

/// Shared line source for everything that reads operator input.
pub struct ConsoleInput {
    lines: Mutex<mpsc::Receiver<String>>,
}

impl ConsoleInput {
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }

    /// Spawn the stdin reader task and return its line source.
    pub fn stdin() -> Arc<Self> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        return;
                    }
                    Err(e) => {
                        debug!(error = %e, "stdin read failed");
                        return;
                    }
                }
            }
        });
        Arc::new(Self::new(rx))
    }

    /// Next operator line; `None` once input is closed.
    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}

/// `y`/`yes`, any case, counts as consent.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_prompt(text: &str) {
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{text}");
    let _ = out.flush();
}

/// Asks the operator on the console.
pub struct ConsoleApproval {
    input: Arc<ConsoleInput>,
}

impl ConsoleApproval {
    pub const fn new(input: Arc<ConsoleInput>) -> Self {
        Self { input }
    }
}

#[async_trait]
impl SignatureApproval for ConsoleApproval {
    async fn approve(&self, request: &ApprovalRequest) -> bool {
        match request {
            ApprovalRequest::Connect { address } => {
                print_prompt(&format!("Connect account {address}? (yes/no): "));
            }
            ApprovalRequest::Sign { legs } => {
                println!("Signature requested for {} leg(s):", legs.len());
                for (i, leg) in legs.iter().enumerate() {
                    println!("  [{}] {leg}", i + 1);
                }
                print_prompt("Sign? (yes/no): ");
            }
        }
        self.input
            .next_line()
            .await
            .is_some_and(|answer| is_affirmative(&answer))
    }
}

/// Approves everything. For scripted runs.
pub struct AutoApproval;

#[async_trait]
impl SignatureApproval for AutoApproval {
    async fn approve(&self, request: &ApprovalRequest) -> bool {
        debug!(?request, "Auto-approved");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" YES \n"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
    }

    #[tokio::test]
    async fn test_console_approval_reads_next_line() {
        let (tx, rx) = mpsc::channel(4);
        let input = Arc::new(ConsoleInput::new(rx));
        let approval = ConsoleApproval::new(Arc::clone(&input));

        tx.send("yes".to_string()).await.unwrap();
        tx.send("n".to_string()).await.unwrap();

        let request = ApprovalRequest::Sign {
            legs: vec!["pay 1 ALGO".to_string()],
        };
        assert!(approval.approve(&request).await);
        assert!(!approval.approve(&request).await);

        drop(tx);
        assert!(!approval.approve(&request).await);
    }

    #[tokio::test]
    async fn test_auto_approval() {
        assert!(AutoApproval.approve(&ApprovalRequest::Sign { legs: vec![] }).await);
    }
}
