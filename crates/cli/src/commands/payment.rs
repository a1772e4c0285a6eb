//! Payment confirmation command.

use reklama_core::PaymentSessionId;
use reklama_storefront::payment::PaymentOutcome;
use reklama_storefront::state::AppState;

/// Wait for the payment to settle; Ctrl+C stops waiting.
#[allow(clippy::print_stdout)]
pub async fn confirm(state: &AppState, session_id: &str) {
    let poller = state.poller();
    println!(
        "Checking payment status (up to {} attempts)...",
        poller.max_attempts()
    );

    let handle = poller.spawn(
        state.api().clone(),
        state.cart().clone(),
        PaymentSessionId::new(session_id),
    );

    // Dropping the handle on Ctrl+C cancels the poll
    let outcome = tokio::select! {
        outcome = handle.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => PaymentOutcome::Cancelled,
    };

    match &outcome {
        PaymentOutcome::Paid(receipt) => {
            println!("Payment successful!");
            println!("{}", outcome.user_message());
            println!("Amount paid: {receipt}");
        }
        PaymentOutcome::Expired => {
            println!("Session expired");
            println!("{}", outcome.user_message());
        }
        PaymentOutcome::Unknown(_) => {
            println!("Payment status unknown");
            println!("{}", outcome.user_message());
        }
        PaymentOutcome::Cancelled => println!("{}", outcome.user_message()),
    }
}
