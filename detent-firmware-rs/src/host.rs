//! Host link over a buffered UART.
//!
//! The receive task decodes request frames and hands each request to the
//! control loop through a one-slot channel, so at most one request is in
//! flight. The loop answers through [`ChannelLink`], which frames the
//! response and queues it for the transmit task. Neither task ever blocks
//! the control loop.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embedded_io_async::{Read, Write};

use detent::io::HostLink;
use detent::protocol::{
    encode_response, FrameDecoder, Request, Response, ResponseFrame, STATUS_ERROR,
};

/// Pending request, written by the receive task.
pub type RequestChannel = Channel<CriticalSectionRawMutex, Request, 1>;

/// Framed responses waiting for the transmit task.
pub type ResponseChannel = Channel<CriticalSectionRawMutex, ResponseFrame, 2>;

pub static REQUESTS: RequestChannel = Channel::new();
pub static RESPONSES: ResponseChannel = Channel::new();

/// Set by the receive task on the first well-formed frame.
pub static LINK_READY: AtomicBool = AtomicBool::new(false);

// ---------------------------------------------------------------------------
// Control loop side
// ---------------------------------------------------------------------------

/// [`HostLink`] backed by the static channels.
pub struct ChannelLink {
    requests: Receiver<'static, CriticalSectionRawMutex, Request, 1>,
    responses: Sender<'static, CriticalSectionRawMutex, ResponseFrame, 2>,
    ready: &'static AtomicBool,
    error: bool,
}

impl ChannelLink {
    pub fn new(
        requests: &'static RequestChannel,
        responses: &'static ResponseChannel,
        ready: &'static AtomicBool,
    ) -> Self {
        Self {
            requests: requests.receiver(),
            responses: responses.sender(),
            ready,
            error: false,
        }
    }

    fn status(&self) -> u8 {
        if self.error {
            STATUS_ERROR
        } else {
            0
        }
    }

    fn send(&mut self, response: &Response) {
        let frame = encode_response(response, self.status());
        if self.responses.try_send(frame).is_err() {
            warn!("response to request {} dropped, transmit queue full", response.code);
        }
    }
}

impl HostLink for ChannelLink {
    fn poll_request(&mut self) -> Option<Request> {
        self.requests.try_receive().ok()
    }

    fn respond(&mut self, response: Response) {
        self.send(&response);
    }

    /// Raise the sticky flag and send an empty frame carrying it, so a host
    /// waiting for a reply is not left hanging.
    fn raise_error(&mut self, code: u8) {
        self.error = true;
        self.send(&Response::empty(code));
    }

    fn error_flag(&self) -> bool {
        self.error
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Transport tasks
// ---------------------------------------------------------------------------

/// Decode request frames from `rx` forever.
pub async fn receive_requests<R: Read>(
    mut rx: R,
    requests: &'static RequestChannel,
    ready: &'static AtomicBool,
) -> ! {
    info!("Host receive task started");

    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; 16];
    let mut dropped = 0;

    loop {
        let n = match rx.read(&mut buf).await {
            Ok(n) => n,
            Err(_) => {
                warn!("Host UART read error");
                continue;
            }
        };

        for &byte in &buf[..n] {
            if let Some(request) = decoder.push(byte) {
                if !ready.swap(true, Ordering::Relaxed) {
                    info!("Host link up");
                }
                debug!("Request {}", request);
                // Waits while the previous request is still pending.
                requests.send(request).await;
            }
        }

        if decoder.dropped() != dropped {
            dropped = decoder.dropped();
            warn!("{} request frames dropped (bad checksum)", dropped);
        }
    }
}

/// Write queued response frames to `tx` forever.
pub async fn transmit_responses<W: Write>(mut tx: W, responses: &'static ResponseChannel) -> ! {
    info!("Host transmit task started");

    loop {
        let frame = responses.receive().await;
        if tx.write_all(&frame).await.is_err() {
            warn!("Host UART write error");
        }
    }
}
