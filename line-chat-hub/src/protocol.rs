use std::{fmt, io};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Prefix every login line must start with.
pub const LOGIN_PREFIX: &str = "[ + ] login:";

/// Longest accepted line in bytes, delimiter excluded.
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Lines the hub sends to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    LoginBusy { login: String },
    InvalidLogin,
    NewUser { login: String },
    UnreadCount { count: usize },
    Unread { content: String },
    NothingUnread,
    Chat { login: String, text: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Welcome => f.write_str("[ ! ] Welcome to the chat!"),
            Notice::LoginBusy { login } => write!(f, "[ - ] Login {login} is busy, try another..."),
            Notice::InvalidLogin => f.write_str("[ ! ] Invalid login!"),
            Notice::NewUser { login } => write!(f, "[ + ] New user: {login}"),
            Notice::UnreadCount { count } => write!(f, "[ ! ] You have {count} new messages:"),
            Notice::Unread { content } => write!(f, "[ * ] {content}"),
            Notice::NothingUnread => f.write_str("[ ! ] There is no new messages."),
            Notice::Chat { login, text } => write!(f, "{login}: {text}"),
        }
    }
}

/// Returns the raw remainder of a login line, or `None` if the prefix is missing.
pub fn parse_login(line: &str) -> Option<&str> {
    line.strip_prefix(LOGIN_PREFIX)
}

pub fn login_line(login: &str) -> String {
    format!("{LOGIN_PREFIX}{login}")
}

/// Reads one `\n`-terminated line, dropping the delimiter and a `\r` before it.
///
/// Returns `Ok(None)` on end of stream; a trailing partial line is discarded.
/// Lines over [`MAX_LINE_BYTES`] and invalid UTF-8 are reported as `InvalidData`.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let limit = (MAX_LINE_BYTES + 2) as u64;
    let bytes = (&mut *reader).take(limit).read_line(&mut line).await?;
    if bytes == 0 {
        return Ok(None);
    }

    let Some(body) = line.strip_suffix('\n') else {
        if bytes as u64 >= limit {
            return Err(line_too_long());
        }
        return Ok(None);
    };
    let body = body.strip_suffix('\r').unwrap_or(body);
    if body.len() > MAX_LINE_BYTES {
        return Err(line_too_long());
    }

    Ok(Some(body.to_string()))
}

pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = Vec::with_capacity(line.len() + 1);
    encoded.extend_from_slice(line.as_bytes());
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await
}

fn line_too_long() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("line exceeds {MAX_LINE_BYTES} bytes"),
    )
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;

    #[test]
    fn notices_render_wire_format() {
        assert_eq!(Notice::Welcome.to_string(), "[ ! ] Welcome to the chat!");
        assert_eq!(
            Notice::LoginBusy {
                login: "alice".into()
            }
            .to_string(),
            "[ - ] Login alice is busy, try another..."
        );
        assert_eq!(
            Notice::UnreadCount { count: 3 }.to_string(),
            "[ ! ] You have 3 new messages:"
        );
        assert_eq!(
            Notice::Chat {
                login: "bob".into(),
                text: "hi there".into()
            }
            .to_string(),
            "bob: hi there"
        );
    }

    #[test]
    fn login_remainder_is_not_trimmed() {
        assert_eq!(parse_login("[ + ] login: alice "), Some(" alice "));
        assert_eq!(parse_login("[ + ] login:"), Some(""));
        assert_eq!(parse_login("hello"), None);
        assert_eq!(parse_login(" [ + ] login:alice"), None);
    }

    #[tokio::test]
    async fn reads_lines_and_strips_delimiters() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(reader);

        writer
            .write_all(b"first\r\nsecond\n\npartial")
            .await
            .expect("write input");
        drop(writer);

        assert_eq!(read_line(&mut reader).await.expect("read"), Some("first".into()));
        assert_eq!(read_line(&mut reader).await.expect("read"), Some("second".into()));
        assert_eq!(read_line(&mut reader).await.expect("read"), Some(String::new()));
        assert_eq!(read_line(&mut reader).await.expect("read"), None);
    }

    #[tokio::test]
    async fn rejects_over_long_lines() {
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        let mut reader = BufReader::new(reader);

        let mut input = vec![b'x'; MAX_LINE_BYTES + 10];
        input.push(b'\n');
        writer.write_all(&input).await.expect("write input");

        let err = read_line(&mut reader).await.expect_err("line too long");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(reader);

        write_line(&mut writer, &Notice::InvalidLogin.to_string())
            .await
            .expect("write line");

        assert_eq!(
            read_line(&mut reader).await.expect("read"),
            Some("[ ! ] Invalid login!".into())
        );
    }
}
