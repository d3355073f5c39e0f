/// OpenAPI documentation generation.
pub mod documentation;
/// Core game orchestration: actions, transitions, and event publication.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message publication.
pub mod sse_events;
/// Server-Sent Events subscription handling.
pub mod sse_service;
