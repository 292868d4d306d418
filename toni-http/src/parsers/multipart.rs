//! Streaming `multipart/form-data` parser.
//!
//! Sections are recognized as bytes arrive, so only the current section and
//! a delimiter-sized tail are ever buffered. Sections that cannot be
//! understood (unreadable headers, no `Content-Disposition`, no `name`) are
//! skipped and parsing continues with the next one. File sections are
//! collected apart from the string fields.

use memchr::memmem;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use super::form::CancellableReader;
use crate::config::FormOptions;
use crate::error::FormError;
use crate::http_helpers::{FormCollection, FormFile, StringValues};

const MAX_SECTION_HEADERS: usize = 32;
const MAX_SECTION_HEADER_BYTES: usize = 16 * 1024;

pub(crate) struct MultipartReader<'o> {
    /// `CRLF--boundary`. The opening delimiter is matched the same way by
    /// seeding the buffer with a CRLF.
    delimiter: Vec<u8>,
    options: &'o FormOptions,
}

enum State {
    Preamble,
    Headers,
    Content(Section),
    Done,
}

/// What follows a delimiter.
enum Transition {
    NeedMore,
    /// Another section starts after this many bytes.
    Next(usize),
    Close,
    /// The delimiter bytes are part of the content, not a boundary line.
    Literal,
}

enum SectionKind {
    Field {
        name: String,
    },
    File {
        name: String,
        filename: String,
        content_type: Option<String>,
    },
    Skipped,
}

struct Section {
    kind: SectionKind,
    data: Vec<u8>,
}

#[derive(Default)]
struct FormBuilder {
    fields: StringValues,
    files: Vec<FormFile>,
    count: usize,
}

impl<'o> MultipartReader<'o> {
    pub(crate) fn new(boundary: &str, options: &'o FormOptions) -> Self {
        Self {
            delimiter: format!("\r\n--{boundary}").into_bytes(),
            options,
        }
    }

    pub(crate) async fn read<R>(
        &self,
        reader: &mut CancellableReader<'_, R>,
    ) -> Result<FormCollection, FormError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = b"\r\n".to_vec();
        let mut state = State::Preamble;
        let mut form = FormBuilder::default();
        let mut received = 0usize;

        loop {
            loop {
                let (next, progressed) = self.step(&mut buf, state, &mut form)?;
                state = next;
                if !progressed {
                    break;
                }
            }

            if matches!(state, State::Done) {
                break;
            }

            match reader.next_chunk().await? {
                Some(chunk) => {
                    received += chunk.len();
                    if received > self.options.max_body_size {
                        warn!(
                            max_size = self.options.max_body_size,
                            "multipart body larger than allowed"
                        );
                        return Err(FormError::BodyTooLarge {
                            limit: self.options.max_body_size,
                        });
                    }
                    buf.extend_from_slice(chunk);
                }
                None => {
                    return Err(FormError::InvalidMultipart(
                        "body ended before the closing boundary",
                    ));
                }
            }
        }

        debug!(
            fields = form.fields.len(),
            files = form.files.len(),
            "parsed multipart form"
        );
        Ok(FormCollection::new(form.fields, form.files))
    }

    /// Advance the state machine over buffered bytes. The flag is false when
    /// more input is needed.
    fn step(
        &self,
        buf: &mut Vec<u8>,
        state: State,
        form: &mut FormBuilder,
    ) -> Result<(State, bool), FormError> {
        let keep = self.delimiter.len() - 1;

        match state {
            State::Preamble => {
                let Some(at) = memmem::find(&buf[..], &self.delimiter) else {
                    if buf.len() > keep {
                        buf.drain(..buf.len() - keep);
                    }
                    return Ok((State::Preamble, false));
                };

                buf.drain(..at);
                match self.transition(buf) {
                    Transition::NeedMore => Ok((State::Preamble, false)),
                    Transition::Close => Ok((State::Done, true)),
                    Transition::Next(end) => {
                        buf.drain(..end);
                        Ok((State::Headers, true))
                    }
                    Transition::Literal => {
                        buf.drain(..self.delimiter.len());
                        Ok((State::Preamble, true))
                    }
                }
            }

            State::Headers => {
                let mut slots = [httparse::EMPTY_HEADER; MAX_SECTION_HEADERS];
                match httparse::parse_headers(&buf[..], &mut slots) {
                    Ok(httparse::Status::Complete((consumed, headers))) => {
                        let kind = self.section_kind(headers, form);
                        buf.drain(..consumed);
                        Ok((State::Content(Section::new(kind)), true))
                    }
                    Ok(httparse::Status::Partial) if buf.len() > MAX_SECTION_HEADER_BYTES => {
                        debug!("skipping multipart section with oversized headers");
                        Ok((State::Content(Section::new(SectionKind::Skipped)), true))
                    }
                    Ok(httparse::Status::Partial) => Ok((State::Headers, false)),
                    Err(err) => {
                        debug!(%err, "skipping multipart section with unreadable headers");
                        Ok((State::Content(Section::new(SectionKind::Skipped)), true))
                    }
                }
            }

            State::Content(mut section) => {
                let Some(at) = memmem::find(&buf[..], &self.delimiter) else {
                    if buf.len() > keep {
                        let end = buf.len() - keep;
                        section.push(&buf[..end], self.options)?;
                        buf.drain(..end);
                    }
                    return Ok((State::Content(section), false));
                };

                section.push(&buf[..at], self.options)?;
                buf.drain(..at);

                match self.transition(buf) {
                    Transition::NeedMore => Ok((State::Content(section), false)),
                    Transition::Close => {
                        form.finish(section);
                        Ok((State::Done, true))
                    }
                    Transition::Next(end) => {
                        form.finish(section);
                        buf.drain(..end);
                        Ok((State::Headers, true))
                    }
                    Transition::Literal => {
                        let len = self.delimiter.len();
                        section.push(&buf[..len], self.options)?;
                        buf.drain(..len);
                        Ok((State::Content(section), true))
                    }
                }
            }

            State::Done => Ok((State::Done, false)),
        }
    }

    /// Inspect the bytes after a delimiter sitting at the start of `buf`.
    ///
    /// Anything other than `--` or optional whitespace then CRLF means the
    /// match was ordinary content that happens to start like a boundary.
    fn transition(&self, buf: &[u8]) -> Transition {
        let after = self.delimiter.len();
        let rest = &buf[after..];
        if rest.len() < 2 {
            return Transition::NeedMore;
        }
        if rest.starts_with(b"--") {
            return Transition::Close;
        }

        // Linear whitespace may pad the delimiter line.
        let padding = rest
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count();
        let rest = &rest[padding..];
        match rest {
            [b'\r', b'\n', ..] => Transition::Next(after + padding + 2),
            [] | [b'\r'] => Transition::NeedMore,
            _ => {
                debug!("delimiter-like bytes inside multipart content");
                Transition::Literal
            }
        }
    }

    fn section_kind(&self, headers: &[httparse::Header<'_>], form: &FormBuilder) -> SectionKind {
        if form.count >= self.options.max_fields {
            debug!(
                max_fields = self.options.max_fields,
                "dropping multipart section past the field limit"
            );
            return SectionKind::Skipped;
        }

        let header = |name: &str| {
            headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .and_then(|h| std::str::from_utf8(h.value).ok())
                .map(str::trim)
        };

        let Some(disposition) = header("content-disposition") else {
            debug!("skipping multipart section without Content-Disposition");
            return SectionKind::Skipped;
        };

        match parse_content_disposition(disposition) {
            Some((name, Some(filename))) => SectionKind::File {
                name,
                filename,
                content_type: header("content-type").map(str::to_string),
            },
            Some((name, None)) => SectionKind::Field { name },
            None => {
                debug!(disposition, "skipping multipart section with unusable Content-Disposition");
                SectionKind::Skipped
            }
        }
    }
}

impl Section {
    fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            data: Vec::new(),
        }
    }

    fn push(&mut self, bytes: &[u8], options: &FormOptions) -> Result<(), FormError> {
        match &self.kind {
            SectionKind::Skipped => {}
            SectionKind::File { name, .. } => {
                if self.data.len() + bytes.len() > options.max_file_size {
                    warn!(field = %name, max_size = options.max_file_size, "uploaded file larger than allowed");
                    return Err(FormError::FileTooLarge {
                        name: name.clone(),
                        limit: options.max_file_size,
                    });
                }
                self.data.extend_from_slice(bytes);
            }
            SectionKind::Field { .. } => self.data.extend_from_slice(bytes),
        }
        Ok(())
    }
}

impl FormBuilder {
    fn finish(&mut self, section: Section) {
        match section.kind {
            SectionKind::Skipped => {}
            SectionKind::Field { name } => {
                let value = String::from_utf8_lossy(&section.data).into_owned();
                self.fields.append(name, value);
                self.count += 1;
            }
            SectionKind::File {
                name,
                filename,
                content_type,
            } => {
                self.files.push(FormFile {
                    name,
                    filename,
                    content_type,
                    data: section.data,
                });
                self.count += 1;
            }
        }
    }
}

/// Parse `form-data; name="field"; filename="a.txt"` into the field name and
/// optional file name. `None` when the disposition is not `form-data` or
/// carries no usable name.
fn parse_content_disposition(value: &str) -> Option<(String, Option<String>)> {
    let params = split_params(value);
    let (disposition, params) = params.split_first()?;
    if !disposition.trim().eq_ignore_ascii_case("form-data") {
        return None;
    }

    let mut name = None;
    let mut filename = None;
    for param in params {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name = Some(unquote(raw.trim()));
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(unquote(raw.trim()));
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some((name, filename))
}

/// Split on `;` outside of quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (idx, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}
