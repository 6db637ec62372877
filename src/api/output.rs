use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
    sync::{Arc, Mutex},
};

use http::HeaderMap;
use serde_json::Value;
use tabwriter::TabWriter;

#[cfg(feature = "color")]
use colored::Colorize;

use crate::common::{
    data::{BaseResponse, NormalizedRequest},
    util::headers_to_json,
};

const INDENT: &str = "    ";

/// How request/response pairs are printed when logging is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// A header line followed by indented `request` and `response` groups.
    #[default]
    Grouped,
    /// One line for the request and one for the response.
    Flat,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grouped" | "group" => Ok(LogFormat::Grouped),
            "flat" => Ok(LogFormat::Flat),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Grouped => write!(f, "grouped"),
            LogFormat::Flat => write!(f, "flat"),
        }
    }
}

/// Destination of the request/response log.
pub trait LogSink: Send + Sync {
    fn write(&self, text: &str) -> io::Result<()>;
}

/// Writes to the standard error stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(text.as_bytes())?;
        stderr.flush()
    }
}

/// Keeps everything written in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, text: &str) -> io::Result<()> {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_str(text);
        Ok(())
    }
}

/// Renders one request/response pair.
pub fn render_exchange(
    format: LogFormat,
    request_headers: &HeaderMap,
    response: &BaseResponse,
    normalized: &NormalizedRequest,
) -> io::Result<String> {
    match format {
        LogFormat::Grouped => render_grouped(request_headers, response, normalized),
        LogFormat::Flat => Ok(render_flat(request_headers, response, normalized)),
    }
}

fn render_grouped(
    request_headers: &HeaderMap,
    response: &BaseResponse,
    normalized: &NormalizedRequest,
) -> io::Result<String> {
    let method = paint_method(normalized.method_str());
    let status = paint_status(response.status);

    let mut tw = TabWriter::new(vec![]);

    writeln!(tw, "{} {} (restmock)", method, normalized.url())?;
    writeln!(tw, "{}request", INDENT)?;
    writeln!(tw, "{}{}{} {}", INDENT, INDENT, method, normalized.url())?;
    writeln!(tw, "{}{}headers\t{}", INDENT, INDENT, headers_to_json(request_headers))?;
    writeln!(tw, "{}{}body\t{}", INDENT, INDENT, render_body(normalized.request_body()))?;
    writeln!(tw, "{}response {}", INDENT, status)?;
    writeln!(tw, "{}{}headers\t{}", INDENT, INDENT, headers_to_json(&response.headers))?;
    writeln!(tw, "{}{}body\t{}", INDENT, INDENT, render_body(response.body.as_ref()))?;

    tw.flush()?;

    let bytes = tw
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn render_flat(
    request_headers: &HeaderMap,
    response: &BaseResponse,
    normalized: &NormalizedRequest,
) -> String {
    format!(
        "restmock request  {} {} headers {} body {}\nrestmock response {} headers {} body {}\n",
        paint_method(normalized.method_str()),
        normalized.url(),
        headers_to_json(request_headers),
        render_body(normalized.request_body()),
        paint_status(response.status),
        headers_to_json(&response.headers),
        render_body(response.body.as_ref()),
    )
}

fn render_body(body: Option<&Value>) -> String {
    match body {
        None => "undefined".to_string(),
        Some(value) => value.to_string(),
    }
}

#[cfg(feature = "color")]
fn paint_method(method: &str) -> String {
    method.bold().to_string()
}

#[cfg(not(feature = "color"))]
fn paint_method(method: &str) -> String {
    method.to_string()
}

#[cfg(feature = "color")]
fn paint_status(status: u16) -> String {
    if status < 400 {
        status.to_string().green().to_string()
    } else {
        status.to_string().red().to_string()
    }
}

#[cfg(not(feature = "color"))]
fn paint_status(status: u16) -> String {
    status.to_string()
}
