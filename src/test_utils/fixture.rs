use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Chooser;
use crate::DataApi;
use crate::DataConfig;
use crate::Directory;
use crate::DirectoryCore;
use crate::DirectoryHandler;
use crate::ElectedRole;
use crate::IntentsApi;
use crate::IntentsConfig;
use crate::LivenessConfig;
use crate::ManualClock;
use crate::NamesApi;
use crate::NamesConfig;
use crate::Outbox;
use crate::Packet;
use crate::PacketContext;
use crate::PreferenceStore;

pub(crate) const START_MS: u64 = 1_000;

/// A directory wired to a manual clock and a readable outbox.
pub(crate) struct Fixture<H: DirectoryHandler> {
    pub dir: Directory<H>,
    pub clock: ManualClock,
    outbox: mpsc::UnboundedReceiver<Packet>,
}

impl<H: DirectoryHandler> Fixture<H> {
    pub(crate) fn new(
        name: &str,
        handler: H,
        liveness: &LivenessConfig,
    ) -> Self {
        let (outbox, rx) = Outbox::channel();
        let clock = ManualClock::new(START_MS);
        let core = DirectoryCore::new(name, outbox, Arc::new(clock.clone()));
        let dir = Directory::new(core, handler, liveness).expect("bootstrap should succeed");
        Self {
            dir,
            clock,
            outbox: rx,
        }
    }

    /// Promotes the directory with nothing to load.
    pub(crate) fn lead(&mut self) {
        assert!(self.dir.set_role(ElectedRole::Leader));
        assert!(self.dir.finish_transition(Vec::new()).is_empty());
    }

    /// Sends `packet` through the full pipeline and returns the response, if any.
    pub(crate) async fn request(
        &mut self,
        packet: Packet,
    ) -> Option<Packet> {
        let (ctx, mut rx) = PacketContext::channel(packet);
        self.dir.drive(ctx).await;
        rx.try_recv().ok()
    }

    /// Like [`Fixture::request`] but the response must exist.
    pub(crate) async fn call(
        &mut self,
        packet: Packet,
    ) -> Packet {
        self.request(packet).await.expect("a response was expected")
    }

    /// Drains every packet the directory sent on its own.
    pub(crate) fn sent(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.outbox.try_recv() {
            packets.push(packet);
        }
        packets
    }
}

pub(crate) fn names_fixture() -> Fixture<NamesApi> {
    let config = NamesConfig::default();
    let liveness = config.directory.liveness.clone();
    let api = NamesApi::new(config).expect("default names config is valid");
    Fixture::new(crate::constants::NAMES_API, api, &liveness)
}

pub(crate) fn data_fixture() -> Fixture<DataApi> {
    let config = DataConfig::default();
    Fixture::new(crate::constants::DATA_API, DataApi::new(&config), &config.directory.liveness)
}

pub(crate) fn intents_fixture(
    preferences: impl PreferenceStore,
    chooser: impl Chooser,
) -> Fixture<IntentsApi> {
    let config = IntentsConfig::default();
    let api = IntentsApi::new(&config, "ozpIwc.peer", Arc::new(preferences), Arc::new(chooser))
        .expect("default intents config is valid");
    Fixture::new(crate::constants::INTENTS_API, api, &config.directory.liveness)
}
