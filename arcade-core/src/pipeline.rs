//! Pipeline: scan, map, encode and hand off, one cycle per poll.

use crate::debounce::{Scanner, Timestamp};
use crate::encode::{Encode, HidEncoder, JvsConfig, OutputMode, Report};
use crate::input::{LogicalInput, PinBank};
use crate::jvs_switches::JvsSwitchEncoder;
use crate::mapping::Mapper;
use crate::output::{Transport, TransportError};
use arcade_proto::{ActionSet, ConfigBlock, MAX_PLAYERS};
use jvs_proto::{FrameError, JvsDecoder, JvsIo, MAX_ENCODED_LEN};

/// Error type for pipeline operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
    /// Error from the transport.
    Transport(TransportError),
    /// JVS response did not fit the transmit buffer.
    Frame(FrameError),
}

impl From<TransportError> for PipelineError {
    fn from(err: TransportError) -> Self {
        PipelineError::Transport(err)
    }
}

impl From<FrameError> for PipelineError {
    fn from(err: FrameError) -> Self {
        PipelineError::Frame(err)
    }
}

/// JVS slave side of the pipeline.
pub struct JvsLink {
    encoder: JvsSwitchEncoder,
    decoder: JvsDecoder,
    io: JvsIo,
    byte_timeout_ms: u32,
    tx: [u8; MAX_ENCODED_LEN],
}

impl JvsLink {
    #[must_use]
    pub fn new(config: JvsConfig) -> Self {
        Self {
            encoder: config.encoder,
            decoder: JvsDecoder::new(),
            io: JvsIo::new(config.board),
            byte_timeout_ms: config.byte_timeout_ms,
            tx: [0; MAX_ENCODED_LEN],
        }
    }

    #[must_use]
    pub fn io(&self) -> &JvsIo {
        &self.io
    }

    /// Mutable engine access, e.g. for coin inputs.
    pub fn io_mut(&mut self) -> &mut JvsIo {
        &mut self.io
    }

    #[must_use]
    pub fn decoder(&self) -> &JvsDecoder {
        &self.decoder
    }

    /// Refresh the switch words, then read request bytes until the link
    /// goes quiet or one request has been answered.
    async fn service<T: Transport>(
        &mut self,
        actions: &ActionSet,
        transport: &mut T,
    ) -> Result<(), PipelineError> {
        self.encoder.load(actions, &mut self.io);

        for _ in 0..MAX_ENCODED_LEN {
            let Some(byte) = transport.try_receive(self.byte_timeout_ms).await else {
                return Ok(());
            };
            let Some(request) = self.decoder.push_byte(byte) else {
                continue;
            };

            let addressed = self.io.device_id();
            let len = match self.io.handle(&request) {
                Some(response) => Some(response.encode(&mut self.tx)?),
                None => None,
            };
            match (addressed, self.io.device_id()) {
                (None, Some(id)) => info!("jvs address assigned: {=u8}", id),
                (Some(_), None) => info!("jvs bus reset"),
                _ => {}
            }

            if let Some(len) = len {
                transport.send(&self.tx[..len]).await?;
            }
            return Ok(());
        }
        Ok(())
    }
}

/// Where encoded output goes.
pub enum Link {
    /// Change-detected USB HID reports.
    Hid {
        encoder: HidEncoder,
        last_sent: [Option<Report>; MAX_PLAYERS],
    },
    /// Request/response JVS slave.
    Jvs(JvsLink),
}

impl Link {
    fn new(mode: OutputMode) -> Self {
        let hid = |encoder| Link::Hid {
            encoder,
            last_sent: Default::default(),
        };
        match mode {
            OutputMode::Joystick(enc) => hid(HidEncoder::Joystick(enc)),
            OutputMode::Keyboard(enc) => hid(HidEncoder::Keyboard(enc)),
            OutputMode::Jvs(config) => Link::Jvs(JvsLink::new(config)),
        }
    }
}

fn mapped_players(mode: &OutputMode) -> usize {
    match mode {
        OutputMode::Joystick(enc) => usize::from(enc.players),
        OutputMode::Keyboard(_) => MAX_PLAYERS,
        OutputMode::Jvs(config) => usize::from(config.encoder.players),
    }
}

/// Owns every piece of per-cycle state.
///
/// Call [`poll`](Pipeline::poll) in a loop. In HID modes it is paced by the
/// transport; in JVS mode each poll waits at most the byte timeout for a
/// request byte.
pub struct Pipeline<B, T, const N: usize> {
    bank: B,
    transport: T,
    scanner: Scanner<N>,
    mapper: Mapper,
    link: Link,
    pending: Option<ConfigBlock>,
    actions: ActionSet,
}

impl<B: PinBank, T: Transport, const N: usize> Pipeline<B, T, N> {
    pub fn new(
        bank: B,
        transport: T,
        inputs: [LogicalInput; N],
        table: ConfigBlock,
        mode: OutputMode,
    ) -> Self {
        Self {
            bank,
            transport,
            scanner: Scanner::new(inputs),
            mapper: Mapper::new(table, mapped_players(&mode)),
            link: Link::new(mode),
            pending: None,
            actions: ActionSet::neutral(),
        }
    }

    /// Run one cycle at time `now` (milliseconds).
    pub async fn poll(&mut self, now: Timestamp) -> Result<(), PipelineError> {
        if let Some(table) = self.pending.take() {
            self.mapper.set_table(table);
            debug!("mapping table applied");
        }

        self.scanner.scan(&mut self.bank, now);
        self.actions = self.mapper.map(&self.scanner.slots());

        match &mut self.link {
            Link::Hid { encoder, last_sent } => {
                if !self.transport.is_configured() {
                    *last_sent = Default::default();
                    return Ok(());
                }
                let count = encoder.report_count();
                for (index, last) in last_sent.iter_mut().enumerate().take(count) {
                    let report = encoder.encode(&self.actions, index);
                    if last.as_ref() == Some(&report) {
                        continue;
                    }
                    if let Err(err) = self.transport.send(&report).await {
                        warn!("report {=usize} send failed: {}", index, err);
                        return Err(err.into());
                    }
                    *last = Some(report);
                }
                Ok(())
            }
            Link::Jvs(link) => link.service(&self.actions, &mut self.transport).await,
        }
    }

    /// Replace the mapping table at the start of the next poll.
    pub fn apply_mapping(&mut self, table: ConfigBlock) {
        self.pending = Some(table);
    }

    /// Actions resolved by the last poll.
    #[must_use]
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    #[must_use]
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    #[must_use]
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// The JVS engine, in JVS mode.
    #[must_use]
    pub fn jvs(&self) -> Option<&JvsLink> {
        match &self.link {
            Link::Jvs(link) => Some(link),
            Link::Hid { .. } => None,
        }
    }

    pub fn jvs_mut(&mut self) -> Option<&mut JvsLink> {
        match &mut self.link {
            Link::Jvs(link) => Some(link),
            Link::Hid { .. } => None,
        }
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Decompose the pipeline into its pin bank and transport.
    pub fn into_parts(self) -> (B, T) {
        (self.bank, self.transport)
    }
}
