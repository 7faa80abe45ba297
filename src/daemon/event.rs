/// An event going through the single tracking loop. Browser transitions and
/// the timer jobs share one channel so every store mutation stays serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The active tab changed or its URL changed. Both get the same handling.
    TabChanged { url: String },
    /// No browser window has focus anymore.
    FocusLost,
    /// A browser window regained focus, with the URL of its active tab when
    /// the browser side knows it.
    FocusGained { url: Option<String> },
    /// Fired at UTC midnight by the reset schedule.
    MidnightReset,
    /// Fired hourly by the sweep schedule.
    IntegritySweep,
}
