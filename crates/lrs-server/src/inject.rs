//! Reload script injection for streamed HTML.
//!
//! [`InjectionCursor`] sees a file one chunk at a time and splices the
//! payload in front of the first `</head>` (or, failing that, `</body>`)
//! without ever holding the whole file. The trailing bytes of each window are
//! withheld until the next chunk arrives, so a marker split across a chunk
//! boundary is still found and written out in one piece.

use axum::body::Bytes;

/// Injection anchors, in priority order.
const MARKERS: [&[u8]; 2] = [b"</head>", b"</body>"];

/// Bytes withheld between chunks: one less than the longest marker.
const CARRY_LEN: usize = max_marker_len() - 1;

const fn max_marker_len() -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < MARKERS.len() {
        if MARKERS[i].len() > max {
            max = MARKERS[i].len();
        }
        i += 1;
    }
    max
}

/// Build the script tag that bootstraps the livereload client.
///
/// The browser fetches `/livereload.js` from whatever hostname it used to
/// reach the page, on the advertised `port`.
pub(crate) fn injection_payload(port: u16) -> Bytes {
    Bytes::from(format!(
        "<script type=\"text/javascript\">\
         (function(){{\
         var s=document.createElement(\"script\");\
         var port={port};\
         s.src=\"//\"+window.location.hostname+\":\"+port+\"/livereload.js?port=\"+port;\
         document.head.appendChild(s);\
         }})();\
         </script>"
    ))
}

/// Per-response injection state.
pub(crate) struct InjectionCursor {
    payload: Bytes,
    carry: Vec<u8>,
    injected: bool,
}

impl InjectionCursor {
    pub(crate) fn new(payload: Bytes) -> Self {
        Self {
            payload,
            carry: Vec::with_capacity(CARRY_LEN),
            injected: false,
        }
    }

    /// Feed the next chunk and return the bytes that are safe to write.
    ///
    /// Output may be empty while the cursor is still withholding a tail.
    pub(crate) fn push(&mut self, chunk: Bytes) -> Bytes {
        if self.injected {
            return chunk;
        }

        let mut window = std::mem::take(&mut self.carry);
        window.extend_from_slice(&chunk);

        if let Some(at) = find_marker(&window) {
            self.injected = true;
            let mut out = Vec::with_capacity(window.len() + self.payload.len());
            out.extend_from_slice(&window[..at]);
            out.extend_from_slice(&self.payload);
            out.extend_from_slice(&window[at..]);
            return Bytes::from(out);
        }

        let keep = window.len().min(CARRY_LEN);
        self.carry = window.split_off(window.len() - keep);
        Bytes::from(window)
    }

    /// End of stream: release the withheld tail, followed by the payload if
    /// no marker was ever seen.
    pub(crate) fn finish(self) -> Bytes {
        if self.injected {
            return Bytes::new();
        }
        let mut out = self.carry;
        out.extend_from_slice(&self.payload);
        Bytes::from(out)
    }

    #[cfg(test)]
    fn injected(&self) -> bool {
        self.injected
    }
}

/// Offset of the highest-priority marker present in `window`.
fn find_marker(window: &[u8]) -> Option<usize> {
    MARKERS.iter().find_map(|marker| {
        window
            .windows(marker.len())
            .position(|candidate| candidate == *marker)
    })
}
