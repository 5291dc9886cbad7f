/// Execute an aggregate command deterministically (no IO, no async).
///
/// Combines decision and state evolution in one step:
///
/// 1. **Decide**: calls `aggregate.handle(command)` to get events (pure).
/// 2. **Evolve**: applies each event via `aggregate.apply(event)`.
///
/// Useful for unit tests and inline processing that does not need persistence
/// or publication; production paths go through the command dispatcher, which
/// adds persistence, publication, and optimistic concurrency control.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: rentloop_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
