use serde::{Deserialize, Serialize};

/// Commands delivered to the in-page engine from the companion UI or the
/// background context. Wire shape is `{"type": ..., ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "GET_TIME")]
    GetTime,
    #[serde(rename = "SHOW_MEMO_POPUP")]
    ShowMemoPopup {
        #[serde(rename = "videoId", default, skip_serializing_if = "Option::is_none")]
        video_id: Option<String>,
    },
    #[serde(rename = "SEEK_TO")]
    SeekTo { time: f64 },
    #[serde(rename = "MEMO_VISIBILITY_CHANGED")]
    MemoVisibilityChanged { enabled: bool },
}

/// Replies flowing back to the caller. `GET_TIME` answers with `{time}`,
/// `SEEK_TO` with `{ok}`; the other commands have no reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Time { time: f64 },
    SeekAck { ok: bool },
}

/// Transport to a page's content context, as seen from the companion side.
///
/// `request` fails when the receiving context is not loaded; `inject`
/// (re)loads it so the call can be retried.
pub trait ContentFrame {
    fn request(&mut self, req: &Request) -> anyhow::Result<Response>;
    fn inject(&mut self) -> anyhow::Result<()>;
}

/// Send a request with the retry-once-then-degrade policy: one send, on
/// transport failure one inject plus one more send, then give up. Never more
/// than two attempts.
pub fn request_with_reinject(frame: &mut dyn ContentFrame, req: &Request) -> Option<Response> {
    match frame.request(req) {
        Ok(resp) => Some(resp),
        Err(first) => {
            tracing::debug!("content frame call failed, reinjecting: {first}");
            if let Err(e) = frame.inject() {
                tracing::debug!("content frame inject failed: {e}");
                return None;
            }
            match frame.request(req) {
                Ok(resp) => Some(resp),
                Err(second) => {
                    tracing::debug!("content frame retry failed: {second}");
                    None
                }
            }
        }
    }
}

/// Current playback time of the frame's video, degraded to `0` when the
/// channel cannot be established.
pub fn current_time(frame: &mut dyn ContentFrame) -> f64 {
    match request_with_reinject(frame, &Request::GetTime) {
        Some(Response::Time { time }) => time.max(0.0),
        _ => 0.0,
    }
}
