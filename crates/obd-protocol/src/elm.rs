//! ELM327 text protocol: request parsing and reply decoding.
//!
//! The adapter answers each command with one or more lines of hex text
//! terminated by a `>` prompt. Headers are switched off during
//! initialization (`ATH0`), so each data line starts with the response SID
//! (request mode + 0x40). CAN multi-frame replies are prefixed with a byte
//! count line (`00A`) and `N:` frame indices.

use crate::error::ObdError;
use crate::mode;

/// Offset added to request mode to get response SID.
pub const RESPONSE_SID_OFFSET: u8 = 0x40;

/// Prompt character that terminates every adapter reply
pub const PROMPT: u8 = b'>';

/// Replies the adapter uses for bus-level failures
const BUS_ERRORS: [&str; 9] = [
    "CAN ERROR",
    "BUS ERROR",
    "BUS BUSY",
    "UNABLE TO CONNECT",
    "STOPPED",
    "BUFFER FULL",
    "FB ERROR",
    "DATA ERROR",
    "ACT ALERT",
];

/// A parsed OBD request (`010C`, `03`, `04`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub mode: u8,
    pub pid: Option<u8>,
}

impl Request {
    /// Parse a hex command string as sent to the adapter.
    pub fn parse(command: &str) -> Result<Self, ObdError> {
        let bytes = hex_bytes(command.trim())
            .ok_or_else(|| ObdError::InvalidResponse(format!("not an OBD command: {command}")))?;
        match bytes.as_slice() {
            [mode] => Ok(Self { mode: *mode, pid: None }),
            [mode, pid] => Ok(Self {
                mode: *mode,
                pid: Some(*pid),
            }),
            _ => Err(ObdError::InvalidResponse(format!(
                "not an OBD command: {command}"
            ))),
        }
    }

    /// SID the ECU answers with
    pub fn response_sid(&self) -> u8 {
        self.mode.wrapping_add(RESPONSE_SID_OFFSET)
    }

    /// Number of header bytes (SID plus PID echo) before the data
    fn header_len(&self) -> usize {
        if self.pid.is_some() {
            2
        } else {
            1
        }
    }
}

/// Split a raw reply into trimmed, non-empty lines with the prompt and
/// progress messages removed.
pub fn clean_lines(raw: &str) -> Vec<String> {
    raw.split(['\r', '\n'])
        .map(|line| line.trim_matches(|c: char| c == '>' || c == '\0' || c.is_whitespace()))
        .map(|line| line.strip_prefix("SEARCHING...").unwrap_or(line).trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !(line.starts_with("BUS INIT") && line.ends_with("OK")))
        .map(str::to_string)
        .collect()
}

/// Decode the reply to `request`.
///
/// Returns `Ok(None)` for `NO DATA`, the data bytes after the header for a
/// positive reply, and an error for adapter or bus faults.
pub fn parse_reply(request: &Request, raw: &str) -> Result<Option<Vec<u8>>, ObdError> {
    let lines = clean_lines(raw);
    let mut no_data = false;
    let mut messages: Vec<Vec<u8>> = Vec::new();
    let mut multi_frame: Vec<u8> = Vec::new();
    let mut multi_frame_len: Option<usize> = None;

    for line in &lines {
        let upper = line.to_ascii_uppercase();
        if upper == "?" {
            return Err(ObdError::UnsupportedCommand(format!(
                "{:02X}{}",
                request.mode,
                request.pid.map(|p| format!("{p:02X}")).unwrap_or_default()
            )));
        }
        if upper == "NO DATA" {
            no_data = true;
            continue;
        }
        if upper.starts_with("BUS INIT") || BUS_ERRORS.iter().any(|e| upper.starts_with(e)) {
            return Err(ObdError::BusError(line.clone()));
        }

        let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
        if let Some((index, frame)) = compact.split_once(':') {
            if index.is_empty() || !index.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ObdError::InvalidResponse(line.clone()));
            }
            let bytes = hex_bytes(frame).ok_or_else(|| ObdError::InvalidResponse(line.clone()))?;
            multi_frame.extend(bytes);
            continue;
        }
        // ISO-TP byte count line ahead of a multi-frame reply
        if compact.len() == 3 {
            if let Ok(len) = usize::from_str_radix(&compact, 16) {
                multi_frame_len = Some(len);
                continue;
            }
        }
        let bytes = hex_bytes(&compact).ok_or_else(|| ObdError::InvalidResponse(line.clone()))?;
        messages.push(bytes);
    }
    if !multi_frame.is_empty() {
        if let Some(len) = multi_frame_len {
            multi_frame.truncate(len);
        }
        messages.push(multi_frame);
    }

    let payloads: Vec<Vec<u8>> = messages
        .into_iter()
        .filter(|msg| msg.first() == Some(&request.response_sid()))
        .filter(|msg| match request.pid {
            Some(pid) => msg.get(1) == Some(&pid),
            None => true,
        })
        .map(|msg| msg[request.header_len().min(msg.len())..].to_vec())
        .collect();

    if payloads.is_empty() {
        if no_data {
            return Ok(None);
        }
        let expected = match request.pid {
            Some(pid) => format!("SID {:02X} PID {:02X}", request.response_sid(), pid),
            None => format!("SID {:02X}", request.response_sid()),
        };
        return Err(ObdError::InvalidResponse(format!(
            "no reply with {expected} in {lines:?}"
        )));
    }

    if request.mode == mode::READ_DTC {
        return Ok(Some(merge_dtc_payloads(payloads)));
    }
    Ok(payloads.into_iter().next())
}

/// Mode 03 replies come one message per ECU (or per line on legacy buses).
/// CAN replies carry a leading code count, which makes the payload odd-sized.
fn merge_dtc_payloads(payloads: Vec<Vec<u8>>) -> Vec<u8> {
    payloads
        .into_iter()
        .flat_map(|payload| {
            if payload.len() % 2 == 1 {
                payload[1..].to_vec()
            } else {
                payload
            }
        })
        .collect()
}

fn hex_bytes(text: &str) -> Option<Vec<u8>> {
    if text.is_empty() || text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
