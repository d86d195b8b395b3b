//! `dsatutor chat`: Interactive or single-message chat mode.

use dsatutor_agent::ChatPipeline;
use dsatutor_config::AppConfig;
use dsatutor_core::message::SessionId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// What the loop should do with one line of input.
#[derive(Debug, PartialEq, Eq)]
enum LineAction<'a> {
    Exit,
    Clear,
    Skip,
    Ask(&'a str),
}

fn classify_line(line: &str) -> LineAction<'_> {
    let line = line.trim();
    if line.is_empty() {
        LineAction::Skip
    } else if line.eq_ignore_ascii_case("exit") {
        LineAction::Exit
    } else if line.eq_ignore_ascii_case("/clear") {
        LineAction::Clear
    } else {
        LineAction::Ask(line)
    }
}

/// Print setup instructions for a missing API key.
pub fn missing_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    DSATUTOR_API_KEY=...   (generic)");
    eprintln!("    GEMINI_API_KEY=...     (Google Gemini)");
    eprintln!();
    eprintln!("  Or add `api_key` to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let session = session_from_arg(session.as_deref())?;

    if let Err(e) = config.require_api_key() {
        missing_key_help();
        return Err(e.into());
    }

    let pipeline = ChatPipeline::from_config(&config)?;
    tracing::debug!(session = %session, "Chat session started");

    if let Some(msg) = message {
        // Single message mode
        let reply = pipeline.ask(&session, &msg).await.map_err(|e| e.user_message())?;
        println!("{}", reply.text);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  DSA Tutor: Interactive Mode");
    println!();
    println!("  Provider:  {}", pipeline.provider_name());
    println!("  Model:     {}", pipeline.model());
    println!("  Session:   {session}");
    println!();
    println!("  Ask about data structures and algorithms.");
    println!("  Type '/clear' to start over, 'exit' or Ctrl+D to quit.");
    println!();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    chat_loop(&pipeline, &session, stdin, &mut stdout).await?;

    Ok(())
}

/// The `--session` value, or a fresh id when none was given.
fn session_from_arg(arg: Option<&str>) -> Result<SessionId, String> {
    match arg {
        Some(raw) => SessionId::parse(raw)
            .map_err(|e| format!("Invalid --session: {}", e.user_message())),
        None => Ok(SessionId::new()),
    }
}

/// Read lines until `exit` or end of input, answering each one.
async fn chat_loop<R, W>(
    pipeline: &ChatPipeline,
    session: &SessionId,
    input: R,
    out: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        out.write_all(b"  You > ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match classify_line(&line) {
            LineAction::Exit => break,
            LineAction::Skip => continue,
            LineAction::Clear => {
                match pipeline.clear(session).await {
                    Ok(()) => out.write_all(b"\n  (conversation cleared)\n\n").await?,
                    Err(e) => {
                        let text = format!("\n  [Error] {}\n\n", e.user_message());
                        out.write_all(text.as_bytes()).await?;
                    }
                }
            }
            LineAction::Ask(question) => {
                let text = match pipeline.ask(session, question).await {
                    Ok(reply) => {
                        let mut text = String::from("\n");
                        for line in reply.text.lines() {
                            text.push_str("  Tutor > ");
                            text.push_str(line);
                            text.push('\n');
                        }
                        text.push('\n');
                        text
                    }
                    Err(e) => format!("\n  [Error] {}\n\n", e.user_message()),
                };
                out.write_all(text.as_bytes()).await?;
            }
        }
    }

    out.write_all(b"\n  Goodbye!\n\n").await?;
    out.flush().await
}
