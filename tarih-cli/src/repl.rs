//! Interactive question loop.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tarih_rag::RagSystem;

use crate::commands;

const PROMPT: &str = "soru> ";

fn is_exit(line: &str) -> bool {
    matches!(line, "çıkış" | "cikis" | "exit" | "quit" | ":q")
}

/// Read questions until EOF, Ctrl-C or an exit word.
pub async fn run(system: &RagSystem, json: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Türk tarihi bilgi rehberi. Çıkmak için 'çıkış' yazın veya Ctrl-D'ye basın.\n");

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if is_exit(question) {
                    break;
                }
                let _ = editor.add_history_entry(question);
                let response = system.query(question).await;
                println!("{}\n", commands::format_response(&response, json)?);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words() {
        assert!(is_exit("çıkış"));
        assert!(is_exit(":q"));
        assert!(!is_exit("Çıkış savaşı ne zaman oldu?"));
    }
}
