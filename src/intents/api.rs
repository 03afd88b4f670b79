use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Chooser;
use super::ChooserRequest;
use super::HandlerChosen;
use super::InFlightIntent;
use super::IntentHandler;
use super::IntentRef;
use super::IntentState;
use super::InvokeTarget;
use super::PreferenceStore;
use super::StateUpdate;
use crate::constants::*;
use crate::ApiError;
use crate::ApiResult;
use crate::CollaboratorError;
use crate::DirectoryCore;
use crate::DirectoryHandler;
use crate::Entity;
use crate::IntentsConfig;
use crate::Outcome;
use crate::Packet;
use crate::PacketContext;
use crate::Reply;
use crate::ResourceRouter;
use crate::Result;
use crate::ValueKind;
use crate::INTENT_TRANSITIONS_TOTAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntentPath {
    InFlight,
    Handler,
    Definition,
    Type,
}

/// Invocation with several candidates, waiting on its preference lookup.
#[derive(Debug, Clone)]
pub struct PendingInvocation {
    resource: String,
    definition: String,
    record: InFlightIntent,
}

/// Collaborator results fed back into the intents directory.
#[derive(Debug)]
pub enum IntentCompletion {
    PreferenceResolved {
        invocation: PendingInvocation,
        preference: std::result::Result<Option<String>, CollaboratorError>,
    },
    ChooserOpened {
        resource: String,
        result: std::result::Result<(), CollaboratorError>,
    },
    PreferenceSaved {
        intent: String,
        result: std::result::Result<(), CollaboratorError>,
    },
}

/// `/<major>/<minor>/<action>` into (`<major>/<minor>`, `<action>`).
fn split_definition(definition: &str) -> ApiResult<(String, String)> {
    let mut segments = definition.trim_start_matches('/').splitn(3, '/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(major), Some(minor), Some(action)) => Ok((format!("{major}/{minor}"), action.to_string())),
        _ => Err(ApiError::bad_content(definition, "expected /<major>/<minor>/<action>")),
    }
}

fn parent_of(resource: &str) -> &str {
    resource.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(resource)
}

fn to_json<T: Serialize>(
    resource: &str,
    value: &T,
) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::bad_content(resource, e))
}

/// Handler registrations and the resolution of every invocation.
pub struct IntentsApi {
    name: String,
    bus_root: String,
    config: IntentsConfig,
    router: ResourceRouter<IntentPath>,
    preferences: Arc<dyn PreferenceStore>,
    chooser: Arc<dyn Chooser>,
}

impl std::fmt::Debug for IntentsApi {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("IntentsApi")
            .field("name", &self.name)
            .field("bus_root", &self.bus_root)
            .field("chooser_uri", &self.config.chooser_uri)
            .finish()
    }
}

impl IntentsApi {
    pub fn new(
        config: &IntentsConfig,
        bus_root: &str,
        preferences: Arc<dyn PreferenceStore>,
        chooser: Arc<dyn Chooser>,
    ) -> Result<Self> {
        let router = ResourceRouter::new()
            .add(r"^/inFlightIntent/[^/]+$", IntentPath::InFlight)?
            .add(r"^/[^/]+/[^/]+/[^/]+/[^/]+$", IntentPath::Handler)?
            .add(r"^/[^/]+/[^/]+/[^/]+$", IntentPath::Definition)?
            .add(r"^/[^/]+/[^/]+$", IntentPath::Type)?;
        Ok(Self {
            name: config.directory.name.clone(),
            bus_root: bus_root.to_string(),
            config: config.clone(),
            router,
            preferences,
            chooser,
        })
    }

    fn bad_action(packet: &Packet) -> ApiError {
        ApiError::BadAction {
            resource: packet.resource().to_string(),
            action: packet.action().to_string(),
        }
    }

    fn is_handler(
        core: &DirectoryCore,
        resource: &str,
    ) -> bool {
        core.store
            .get(resource)
            .is_some_and(|e| e.kind == ValueKind::Handler)
    }

    /// Registered handlers directly under `definition`, in path order.
    fn handlers_of(
        core: &DirectoryCore,
        definition: &str,
    ) -> Vec<String> {
        core.store
            .iter()
            .filter(|e| e.kind == ValueKind::Handler && parent_of(&e.resource) == definition)
            .map(|e| e.resource.clone())
            .collect()
    }

    fn store_record(
        &self,
        core: &mut DirectoryCore,
        resource: &str,
        src: &str,
        record: &InFlightIntent,
    ) -> ApiResult<Value> {
        let value = to_json(resource, record)?;
        core.mutate(resource, src, self.make_value(resource)?, |entity, now| {
            entity.set(value, Some(INTENT_INVOCATION_CONTENT_TYPE), now)
        })?;
        INTENT_TRANSITIONS_TOTAL
            .with_label_values(&[record.state.as_str()])
            .inc();
        debug!(%resource, state = record.state.as_str(), "in-flight intent stored");

        Ok(core
            .store
            .get(resource)
            .map(Entity::to_packet_value)
            .unwrap_or_default())
    }

    /// Where a registered handler wants its invocations delivered.
    fn target_of(
        core: &DirectoryCore,
        in_flight: &str,
        handler: &str,
    ) -> ApiResult<InvokeTarget> {
        let registration = core
            .store
            .get(handler)
            .filter(|e| e.kind == ValueKind::Handler)
            .ok_or_else(|| ApiError::state_conflict(in_flight, format!("{handler} is no longer registered")))?;
        let entry: IntentHandler =
            serde_json::from_value(registration.entity.clone()).map_err(|e| ApiError::bad_content(handler, e))?;
        Ok(entry.invoke_intent)
    }

    /// Sends the stored invocation to `target`.
    fn deliver(
        &self,
        core: &mut DirectoryCore,
        in_flight: &str,
        target: InvokeTarget,
    ) {
        let record = core
            .store
            .get(in_flight)
            .map(Entity::to_packet_value)
            .unwrap_or_default();
        debug!(%in_flight, dst = %target.dst, "delivering intent");
        core.send(Packet {
            dst: target.dst,
            resource: target.resource,
            action: target.action,
            entity: json!({ "inFlightIntent": record }),
            ..Default::default()
        });
    }

    fn register(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
        path: IntentPath,
    ) -> ApiResult<Reply> {
        let resource = packet.resource();
        let (definition, handler_resource) = match path {
            IntentPath::Definition => (resource.to_string(), format!("{resource}/{}", nanoid::nanoid!())),
            IntentPath::Handler => (parent_of(resource).to_string(), resource.to_string()),
            _ => return Err(Self::bad_action(packet)),
        };
        let (intent_type, action) = split_definition(&definition)?;
        let handler = IntentHandler::from_registration(
            &handler_resource,
            &packet.entity,
            &intent_type,
            &action,
            &packet.src,
        )?;
        let value = to_json(&handler_resource, &handler)?;
        let content_type = packet
            .content_type
            .clone()
            .unwrap_or_else(|| INTENT_HANDLER_CONTENT_TYPE.to_string());

        core.mutate(
            &handler_resource,
            &packet.src,
            self.make_value(&handler_resource)?,
            |entity, now| entity.set(value, Some(content_type.as_str()), now),
        )?;
        core.ensure_dynamic_node(
            &definition,
            &format!("^{}/[^/]+$", regex::escape(&definition)),
            INTENT_DEFINITION_CONTENT_TYPE,
        )
        .map_err(|e| ApiError::bad_content(&definition, e))?;

        info!(handler = %handler_resource, dst = %handler.invoke_intent.dst, "intent handler registered");
        Ok(Reply::with_entity(json!({ "resource": handler_resource })))
    }

    fn invoke(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
        path: IntentPath,
    ) -> ApiResult<Outcome<IntentCompletion>> {
        let resource = packet.resource();
        let (definition, candidates) = match path {
            IntentPath::Definition => (resource.to_string(), Self::handlers_of(core, resource)),
            IntentPath::Handler => {
                let only = Self::is_handler(core, resource).then(|| resource.to_string());
                (parent_of(resource).to_string(), only.into_iter().collect())
            }
            _ => return Err(Self::bad_action(packet)),
        };
        let (intent_type, action) = split_definition(&definition)?;

        let in_flight = format!("{IN_FLIGHT_ROOT}/{}", nanoid::nanoid!());
        let mut record = InFlightIntent {
            state: IntentState::Choosing,
            invoker: packet.src.clone(),
            intent: IntentRef { intent_type, action },
            entity: packet.entity.clone(),
            content_type: packet.content_type.clone(),
            handler_choices: candidates,
            handler_chosen: None,
            handler: None,
            reply: None,
        };
        debug!(%resource, %in_flight, candidates = record.handler_choices.len(), "invoking intent");

        match record.handler_choices.len() {
            0 => {
                record.state = IntentState::Fail;
                let form = self.store_record(core, &in_flight, &packet.src, &record)?;
                Err(ApiError::NoMatch {
                    resource: resource.to_string(),
                    in_flight: form,
                })
            }
            1 => {
                let handler = record.handler_choices[0].clone();
                record.state = IntentState::Delivering;
                let target = Self::target_of(core, &in_flight, &handler)?;
                record.handler_chosen = Some(HandlerChosen::new(&handler, "only"));
                self.store_record(core, &in_flight, &packet.src, &record)?;
                self.deliver(core, &in_flight, target);
                Ok(Outcome::Reply(self.in_flight_reply(core, &in_flight)))
            }
            _ => {
                let preferences = self.preferences.clone();
                let timeout = self.config.preference_timeout();
                let invocation = PendingInvocation {
                    resource: in_flight,
                    definition,
                    record,
                };
                Ok(Outcome::Deferred(
                    async move {
                        let preference =
                            match tokio::time::timeout(timeout, preferences.get_preference(&invocation.definition))
                                .await
                            {
                                Ok(found) => found,
                                Err(_) => Err(CollaboratorError::Timeout(timeout)),
                            };
                        IntentCompletion::PreferenceResolved { invocation, preference }
                    }
                    .boxed(),
                ))
            }
        }
    }

    fn in_flight_reply(
        &self,
        core: &DirectoryCore,
        in_flight: &str,
    ) -> Reply {
        let form = core
            .store
            .get(in_flight)
            .map(Entity::to_packet_value)
            .unwrap_or_default();
        Reply::with_entity(json!({ "inFlightIntent": form }))
    }

    /// Second half of a multi-candidate invocation.
    fn resolve(
        &self,
        core: &mut DirectoryCore,
        ctx: &PacketContext,
        invocation: PendingInvocation,
        preference: std::result::Result<Option<String>, CollaboratorError>,
    ) -> Vec<BoxFuture<'static, IntentCompletion>> {
        let PendingInvocation {
            resource,
            definition,
            mut record,
        } = invocation;
        record.handler_choices.retain(|h| Self::is_handler(core, h));

        let preferred = match preference {
            Ok(Some(p)) if record.handler_choices.contains(&p) => Some(p),
            Ok(Some(p)) => {
                debug!(intent = %definition, preference = %p, "ignoring preference outside the candidates");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(intent = %definition, "preference lookup failed, treating as none: {}", e);
                None
            }
        };

        let src = ctx.packet.src.clone();
        let chosen = match (preferred, record.handler_choices.len()) {
            (Some(p), _) => Some(HandlerChosen::new(&p, "pref")),
            (None, 1) => Some(HandlerChosen::new(&record.handler_choices[0], "only")),
            _ => None,
        };

        let mut follow_up = Vec::new();
        let result = match (chosen, record.handler_choices.is_empty()) {
            (Some(chosen), _) => {
                record.state = IntentState::Delivering;
                let handler = chosen.resource.clone();
                record.handler_chosen = Some(chosen);
                Self::target_of(core, &resource, &handler)
                    .and_then(|target| self.store_record(core, &resource, &src, &record).map(|_| target))
                    .map(|target| {
                        self.deliver(core, &resource, target);
                        self.in_flight_reply(core, &resource)
                    })
            }
            (None, true) => {
                record.state = IntentState::Fail;
                self.store_record(core, &resource, &src, &record)
                    .and_then(|form| {
                        Err(ApiError::NoMatch {
                            resource: definition.clone(),
                            in_flight: form,
                        })
                    })
            }
            (None, false) => {
                record.state = IntentState::Choosing;
                let stored = self
                    .store_record(core, &resource, &src, &record)
                    .map(|_| self.in_flight_reply(core, &resource));
                if stored.is_ok() {
                    follow_up.push(self.open_chooser(&resource, record.handler_choices.clone()));
                }
                stored
            }
        };
        core.respond(ctx, result);
        follow_up
    }

    fn open_chooser(
        &self,
        resource: &str,
        candidates: Vec<String>,
    ) -> BoxFuture<'static, IntentCompletion> {
        let chooser = self.chooser.clone();
        let request = ChooserRequest {
            chooser_uri: self.config.chooser_uri.clone(),
            peer: self.bus_root.clone(),
            intent_selection: format!("{}{}", self.name, resource),
            features: self.config.chooser_features.clone(),
            candidates,
        };
        let resource = resource.to_string();
        async move {
            let result = chooser.open(request).await;
            IntentCompletion::ChooserOpened { resource, result }
        }
        .boxed()
    }

    /// A `set` on an in-flight record is a progress report.
    fn update_state(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<IntentCompletion>> {
        let resource = packet.resource();
        if !core.store.contains(resource) {
            return Err(ApiError::bad_resource(&self.name, resource));
        }
        let update: StateUpdate =
            serde_json::from_value(packet.entity.clone()).map_err(|e| ApiError::bad_content(resource, e))?;
        let remember = update
            .handler_chosen
            .as_ref()
            .filter(|c| c.remember)
            .map(|c| c.resource.clone());
        let content_type = packet
            .content_type
            .clone()
            .unwrap_or_else(|| INTENT_INVOCATION_CONTENT_TYPE.to_string());
        // The chosen handler must still be reachable before the record moves.
        let target = match (update.state, &update.handler_chosen) {
            (IntentState::Delivering, Some(chosen)) => Some(Self::target_of(core, resource, &chosen.resource)?),
            _ => None,
        };

        let record = core.mutate(resource, &packet.src, self.make_value(resource)?, |entity, now| {
            let mut record: InFlightIntent =
                serde_json::from_value(entity.entity.clone()).map_err(|e| ApiError::bad_content(resource, e))?;
            record.apply(resource, update)?;
            entity.set(to_json(resource, &record)?, Some(content_type.as_str()), now)?;
            Ok(record)
        })?;
        INTENT_TRANSITIONS_TOTAL
            .with_label_values(&[record.state.as_str()])
            .inc();
        info!(%resource, state = record.state.as_str(), src = %packet.src, "in-flight intent updated");

        if let Some(target) = target {
            self.deliver(core, resource, target);
        }

        let reply = Reply {
            version: core.store.get(resource).map(|e| e.version),
            ..Default::default()
        };
        match remember {
            Some(handler) if record.state == IntentState::Delivering => {
                let preferences = self.preferences.clone();
                let intent = format!("/{}/{}", record.intent.intent_type, record.intent.action);
                Ok(Outcome::ReplyAndDefer(
                    reply,
                    async move {
                        let result = preferences.set_preference(&intent, &handler).await;
                        IntentCompletion::PreferenceSaved { intent, result }
                    }
                    .boxed(),
                ))
            }
            _ => Ok(Outcome::Reply(reply)),
        }
    }
}

impl DirectoryHandler for IntentsApi {
    type Completion = IntentCompletion;

    fn validate_resource(
        &self,
        resource: &str,
    ) -> bool {
        self.router.matches(resource)
    }

    fn make_value(
        &self,
        resource: &str,
    ) -> ApiResult<Entity> {
        let path = self
            .router
            .route(resource)
            .ok_or_else(|| ApiError::bad_resource(&self.name, resource))?;
        Ok(match path {
            IntentPath::InFlight => Entity::new(resource, ValueKind::InFlightIntent)
                .with_content_type(INTENT_INVOCATION_CONTENT_TYPE)
                .with_allowed_content_types(&[INTENT_INVOCATION_CONTENT_TYPE]),
            IntentPath::Handler => Entity::new(resource, ValueKind::Handler)
                .with_content_type(INTENT_HANDLER_CONTENT_TYPE)
                .with_allowed_content_types(&[INTENT_HANDLER_CONTENT_TYPE]),
            IntentPath::Definition => {
                Entity::new(resource, ValueKind::Plain).with_content_type(INTENT_DEFINITION_CONTENT_TYPE)
            }
            IntentPath::Type => Entity::new(resource, ValueKind::Plain),
        })
    }

    fn owned_resources(
        &self,
        core: &DirectoryCore,
        address: &str,
    ) -> Vec<String> {
        core.store
            .iter()
            .filter(|e| e.kind == ValueKind::Handler)
            .filter(|e| e.entity.pointer("/invokeIntent/dst").and_then(Value::as_str) == Some(address))
            .map(|e| e.resource.clone())
            .collect()
    }

    fn handle_set(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<IntentCompletion>> {
        match self.router.route(packet.resource()) {
            Some(IntentPath::InFlight) => self.update_state(core, packet),
            // Handlers only enter the store through registration.
            Some(IntentPath::Handler) => self.register(core, packet, IntentPath::Handler).map(Outcome::Reply),
            _ => {
                let template = self.make_value(packet.resource())?;
                core.set(packet, template).map(Outcome::Reply)
            }
        }
    }

    fn handle_action(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<IntentCompletion>> {
        let path = self
            .router
            .route(packet.resource())
            .ok_or_else(|| ApiError::bad_resource(&self.name, packet.resource()))?;
        match packet.action() {
            "register" => self.register(core, packet, path).map(Outcome::Reply),
            "unregister" if path == IntentPath::Handler => {
                core.delete(packet.resource(), &packet.src).map(Outcome::Reply)
            }
            "invoke" => self.invoke(core, packet, path),
            _ => Err(Self::bad_action(packet)),
        }
    }

    fn complete(
        &mut self,
        core: &mut DirectoryCore,
        ctx: &PacketContext,
        completion: IntentCompletion,
    ) -> Vec<BoxFuture<'static, IntentCompletion>> {
        match completion {
            IntentCompletion::PreferenceResolved { invocation, preference } => {
                self.resolve(core, ctx, invocation, preference)
            }
            IntentCompletion::ChooserOpened { resource, result } => {
                match result {
                    Ok(()) => debug!(%resource, "chooser opened"),
                    Err(e) => warn!(%resource, "chooser could not be opened, invocation stays choosing: {}", e),
                }
                Vec::new()
            }
            IntentCompletion::PreferenceSaved { intent, result } => {
                if let Err(e) = result {
                    warn!(%intent, "could not save intent preference: {}", e);
                }
                Vec::new()
            }
        }
    }
}
