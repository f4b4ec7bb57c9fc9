//! Line-based manual control of a running notifier (`lembur watch`).

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::notifier::OvertimeNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Check,
    Reset,
    Permission,
    Status,
    Help,
    Quit,
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "check" | "c" => Ok(Self::Check),
            "reset" | "r" => Ok(Self::Reset),
            "permission" | "p" => Ok(Self::Permission),
            "status" | "s" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

const HELP: &str = "commands: check, reset, permission, status, help, quit";

/// Run one command. Returns the reply line, or `None` when asked to quit.
pub async fn apply(notifier: &OvertimeNotifier, command: ControlCommand) -> Option<String> {
    let reply = match command {
        ControlCommand::Check => notifier.check_overtime_status().await.format_summary(),
        ControlCommand::Reset => {
            notifier.reset_notification_flag();
            "notification flag reset".to_string()
        }
        ControlCommand::Permission => format!("permission: {}", notifier.request_permission()),
        ControlCommand::Status => format!(
            "threshold {} | timer {} | notification {}",
            notifier.threshold(),
            if notifier.is_running() { "running" } else { "stopped" },
            if notifier.is_shown() { "shown" } else { "armed" }
        ),
        ControlCommand::Help => HELP.to_string(),
        ControlCommand::Quit => return None,
    };
    Some(reply)
}

/// Read commands until `quit` or end of input.
pub async fn serve<R, W>(notifier: &OvertimeNotifier, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match line.parse::<ControlCommand>() {
            Ok(command) => {
                debug!(?command, "Control command");
                match apply(notifier, command).await {
                    Some(reply) => reply,
                    None => break,
                }
            }
            Err(e) => e,
        };
        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifierError;
    use crate::models::{OvertimeNotification, Permission, StatusSnapshot};
    use crate::notification::NotificationHost;
    use crate::status::StatusSource;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct AlwaysNotify;

    #[async_trait]
    impl StatusSource for AlwaysNotify {
        async fn fetch_status(&self) -> Result<StatusSnapshot, NotifierError> {
            Ok(StatusSnapshot {
                should_notify: true,
                has_checked_in: true,
                has_checked_out: false,
            })
        }
    }

    struct SilentHost;

    impl NotificationHost for SilentHost {
        fn permission(&self) -> Permission {
            Permission::Granted
        }

        fn request_permission(&self) -> Permission {
            Permission::Granted
        }

        fn present(&self, _notification: &OvertimeNotification) -> Result<(), NotifierError> {
            Ok(())
        }
    }

    fn notifier() -> OvertimeNotifier {
        let notification = OvertimeNotification {
            title: "t".to_string(),
            body: "b".to_string(),
            icon: String::new(),
            tag: "overtime-alert".to_string(),
            require_interaction: false,
            click_url: String::new(),
        };
        OvertimeNotifier::builder(Arc::new(AlwaysNotify), Arc::new(SilentHost), notification)
            .build()
    }

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!("check".parse(), Ok(ControlCommand::Check));
        assert_eq!(" R \n".parse(), Ok(ControlCommand::Reset));
        assert_eq!("exit".parse(), Ok(ControlCommand::Quit));
        assert!("dance".parse::<ControlCommand>().is_err());
    }

    #[tokio::test]
    async fn serve_runs_commands_until_quit() {
        let notifier = notifier();
        let input: &[u8] = b"check\nstatus\nreset\nstatus\nbogus\nquit\ncheck\n";
        let mut output = Vec::new();

        serve(&notifier, input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "notify=yes checked-in=yes checked-out=no | shown");
        assert!(lines[1].ends_with("notification shown"));
        assert_eq!(lines[2], "notification flag reset");
        assert!(lines[3].ends_with("notification armed"));
        assert!(lines[4].starts_with("unknown command"));
        assert!(!notifier.is_shown());
    }

    #[tokio::test]
    async fn permission_command_reports_decision() {
        let reply = apply(&notifier(), ControlCommand::Permission).await;
        assert_eq!(reply.as_deref(), Some("permission: granted"));
    }
}
