//! Formatting of server frames for the terminal

use chrono::{DateTime, Local, TimeZone, Utc};

use parley_protocol::{Message, ServerMessage};

/// Render one server frame as a line of text
///
/// Returns `None` for frames that produce no output.
pub fn render(msg: &ServerMessage) -> Option<String> {
    match msg {
        ServerMessage::Welcome {
            session_id,
            backlog,
            ..
        } => Some(format!(
            "* connected as session {} ({} earlier messages)",
            session_id, backlog
        )),
        ServerMessage::Message(m) => Some(render_message(m, &Local)),
        ServerMessage::Error { code, message } => Some(format!("! {:?}: {}", code, message)),
        ServerMessage::Pong => Some("* pong".to_string()),
    }
}

/// `[HH:MM:SS] author: body` in the given time zone
pub fn render_message<Tz: TimeZone>(msg: &Message, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let secs = msg.timestamp.trunc() as i64;
    let nanos = (msg.timestamp.fract() * 1e9) as u32;
    let clock = DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|utc| utc.with_timezone(tz).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    format!("[{}] {}: {}", clock, msg.author, msg.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_protocol::ErrorCode;
    use std::sync::Arc;

    #[test]
    fn test_render_message_utc() {
        // 2023-11-14T22:13:20Z
        let msg = Message::new(0, "ana", "hi", 1_700_000_000.75);
        assert_eq!(render_message(&msg, &Utc), "[22:13:20] ana: hi");
    }

    #[test]
    fn test_render_out_of_range_timestamp() {
        let msg = Message::new(0, "ana", "hi", f64::MAX);
        assert_eq!(render_message(&msg, &Utc), "[--:--:--] ana: hi");
    }

    #[test]
    fn test_render_frames() {
        let welcome = ServerMessage::Welcome {
            session_id: 3,
            backlog: 2,
            protocol_version: 1,
        };
        assert_eq!(
            render(&welcome).unwrap(),
            "* connected as session 3 (2 earlier messages)"
        );

        let err = ServerMessage::Error {
            code: ErrorCode::ProtocolMismatch,
            message: "nope".into(),
        };
        assert_eq!(render(&err).unwrap(), "! ProtocolMismatch: nope");

        let msg = ServerMessage::Message(Arc::new(Message::new(0, "bo", "yo", 0.0)));
        assert!(render(&msg).unwrap().ends_with("bo: yo"));
    }
}
