//! Terminal output for the command-line client
//!
//! Streams relay answers to the terminal with a spinner until the first
//! fragment, then re-renders the finished answer as markdown.

pub mod renderer;
pub mod spinner;
pub mod theme;

pub use renderer::TerminalRenderer;
pub use spinner::WaitingSpinner;

use crate::client::{ClientError, Outcome, RelayClient};
use crate::prompt::FeatureKind;
use serde::Serialize;

/// Send one feature request through the relay and render it live
pub async fn ask<B>(
    client: &RelayClient,
    renderer: &TerminalRenderer,
    feature: FeatureKind,
    body: &B,
    raw: bool,
) -> Result<Outcome, ClientError>
where
    B: Serialize + ?Sized,
{
    renderer.render_header(feature.name(), client.base_url());

    let mut spinner = WaitingSpinner::new();
    spinner.start("Waiting for the first fragment...");

    let result = client
        .stream(feature, body, raw, |fragment| {
            spinner.stop();
            renderer.render_delta(fragment);
        })
        .await;
    spinner.stop();

    match &result {
        Ok(outcome) => renderer.render_outcome(outcome),
        Err(e) => renderer.render_error(&e.to_string()),
    }
    result
}
