//! Assembles a [`BusNode`] from a [`BusConfig`].
//!
//! Every collaborator has a default suitable for a headless process:
//! - preferences: [`NoPreferences`]
//! - chooser: [`LoggingChooser`]
//! - endpoint: none, so nothing is loaded or persisted
//! - clock: [`SystemClock`]
//!
//! ## Example
//! ```ignore
//! let (node, mut outbound) = NodeBuilder::new(BusConfig::new()?.validate()?)
//!     .with_endpoint(Arc::new(my_endpoint))
//!     .build()?;
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::info;

use super::BusNode;
use super::DirectoryHandle;
use crate::BusConfig;
use crate::Chooser;
use crate::Clock;
use crate::DataApi;
use crate::Directory;
use crate::DirectoryConfig;
use crate::DirectoryCore;
use crate::DirectoryHandler;
use crate::DirectoryRunner;
use crate::ElectedRole;
use crate::Endpoint;
use crate::EndpointLoader;
use crate::IntentsApi;
use crate::LoggingChooser;
use crate::NamesApi;
use crate::NoPreferences;
use crate::Outbox;
use crate::Packet;
use crate::PreferenceStore;
use crate::Result;
use crate::SystemClock;

pub struct NodeBuilder {
    pub(super) config: BusConfig,
    pub(super) preferences: Option<Arc<dyn PreferenceStore>>,
    pub(super) chooser: Option<Arc<dyn Chooser>>,
    pub(super) endpoint: Option<Arc<dyn Endpoint>>,
    pub(super) clock: Option<Arc<dyn Clock>>,
}

impl NodeBuilder {
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            preferences: None,
            chooser: None,
            endpoint: None,
            clock: None,
        }
    }

    pub fn with_preference_store(
        mut self,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_chooser(
        mut self,
        chooser: Arc<dyn Chooser>,
    ) -> Self {
        self.chooser = Some(chooser);
        self
    }

    /// Loads remote state on leadership and persists it on shutdown.
    pub fn with_endpoint(
        mut self,
        endpoint: Arc<dyn Endpoint>,
    ) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Spawns one task per directory. Must run inside a tokio runtime.
    ///
    /// Returns the node and the receiver of every packet the directories send
    /// on their own: change notifications and intent deliveries.
    pub fn build(self) -> Result<(BusNode, mpsc::UnboundedReceiver<Packet>)> {
        let config = self.config;
        let (outbox, outbound) = Outbox::channel();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let (shutdown_tx, _) = watch::channel(());
        let node = BusNode::new(shutdown_tx);

        let names = NamesApi::new(config.names.clone())?;
        spawn_directory(&node, &config.names.directory, names, None, &outbox, &clock)?;

        let loader_for = |directory: &DirectoryConfig| {
            self.endpoint
                .clone()
                .filter(|_| config.endpoint.load_on_leadership)
                .map(|endpoint| {
                    let root = format!("{}/{}", config.endpoint.api_root.trim_end_matches('/'), directory.name);
                    EndpointLoader::new(endpoint, &root)
                })
        };

        let data = DataApi::new(&config.data);
        let data_loader = loader_for(&config.data.directory);
        spawn_directory(&node, &config.data.directory, data, data_loader, &outbox, &clock)?;

        let intents = IntentsApi::new(
            &config.intents,
            &config.participant.bus_root,
            self.preferences.unwrap_or_else(|| Arc::new(NoPreferences)),
            self.chooser.unwrap_or_else(|| Arc::new(LoggingChooser)),
        )?;
        let intents_loader = loader_for(&config.intents.directory);
        spawn_directory(&node, &config.intents.directory, intents, intents_loader, &outbox, &clock)?;

        info!(directories = ?node.directory_names(), "bus node built");
        Ok((node, outbound))
    }
}

fn spawn_directory<H: DirectoryHandler>(
    node: &BusNode,
    config: &DirectoryConfig,
    handler: H,
    loader: Option<EndpointLoader>,
    outbox: &Outbox,
    clock: &Arc<dyn Clock>,
) -> Result<()> {
    let core = DirectoryCore::new(&config.name, outbox.clone(), clock.clone());
    let directory = Directory::new(core, handler, &config.liveness)?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (roles_tx, roles_rx) = watch::channel(ElectedRole::Member);
    let runner = DirectoryRunner::new(directory, loader, events_rx, roles_rx, node.shutdown_signal());
    let task = tokio::spawn(runner.run());

    node.attach(&config.name, DirectoryHandle::new(events_tx, roles_tx), task);
    Ok(())
}
