// -
// Directory names

pub const NAMES_API: &str = "names.api";
pub const DATA_API: &str = "data.api";
pub const INTENTS_API: &str = "intents.api";

// -
// Names directory content types

pub const API_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-api-v1+json";
pub const ADDRESS_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-address-v1+json";
pub const MULTICAST_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-multicast-address-v1+json";
pub const ROUTER_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-router-v1+json";

pub const API_LIST_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-api-list-v1+json";
pub const ADDRESS_LIST_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-address-list-v1+json";
pub const MULTICAST_LIST_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-multicast-list-v1+json";
pub const ROUTER_LIST_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-router-list-v1+json";

// -
// Intents directory content types

pub const INTENT_HANDLER_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-intent-handler-v1+json";
pub const INTENT_INVOCATION_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-intent-invocation-v1+json";
pub const INTENT_DEFINITION_CONTENT_TYPE: &str = "application/vnd.ozp-iwc-intent-definition-v1+json";

/// Parent of every in-flight intent record
pub const IN_FLIGHT_ROOT: &str = "/inFlightIntent";

// -
// Packet vocabulary

/// Reserved self alias, rewritten to the caller's address path
pub(crate) const SELF_ALIAS: &str = "/me";

pub(crate) const RESPONSE_OK: &str = "ok";
pub(crate) const RESPONSE_CHANGED: &str = "changed";

pub(crate) const PACKET_VERSION: u32 = 1;

/// Actions any directory understands. Others are counted as `other`.
pub(crate) const KNOWN_ACTIONS: &[&str] = &[
    "get",
    "set",
    "delete",
    "watch",
    "unwatch",
    "addChild",
    "removeChild",
    "pushChild",
    "unshiftChild",
    "popChild",
    "shiftChild",
    "register",
    "unregister",
    "invoke",
];
