// # ddns-core
//
// Reconciliation engine for the DDNS system.
//
// ## Architecture Overview
//
// On every tick the engine resolves the machine's addresses, compares them
// with what it last dispatched, and fans out one independent publish task
// per configured target whose address class changed:
// - **IpSource**: Discovers the current address of one family
// - **AddressResolver**: Probes every enabled class into an `AddressSnapshot`
// - **detect_changes**: Pure comparison against the `PublishedState`
// - **DnsProvider**: Find-or-create-then-update for one target
// - **DdnsEngine**: Owns the tick loop and the publish tasks
// - **ProviderRegistry**: Plugin-based registry for drivers and IP sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Provider wire formats live in provider crates
// 2. **Independent Targets**: One failing target never delays another
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: The daemon is a thin shell over this crate
// 5. **Idempotency**: Drivers re-discover remote state on every attempt

pub mod address;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod http;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use address::{AddressClass, AddressSnapshot, Scope};
pub use config::{DdnsConfig, IpSourceConfig, ProviderConfig, ProviderTarget};
pub use detector::{AddressChange, detect_changes};
pub use engine::{DdnsEngine, EngineEvent, RetryPolicy, TickOutcome};
pub use error::{Error, Result};
pub use http::HttpConfig;
pub use registry::ProviderRegistry;
pub use resolver::AddressResolver;
pub use state::PublishedState;
pub use traits::{DnsProvider, IpSource, IpVersion, UpdateResult};
