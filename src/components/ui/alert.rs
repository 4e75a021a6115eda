use crate::components::ui::{Button, ButtonSize, ButtonVariant};
use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Alert, div, "relative flex w-full items-start gap-3 rounded-lg border px-4 py-3 text-sm"}
    clx! {AlertDescription, p, "flex-1 text-sm leading-relaxed"}
}

pub use components::*;

/// Dismissible banner for the latest status message.
#[component]
pub fn Notice(notice: RwSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || notice.with(|n| n.is_some())>
            <Alert attr:role="status" class="mb-3 border-border bg-muted/40">
                <AlertDescription>{move || notice.get().unwrap_or_default()}</AlertDescription>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    on:click=move |_| notice.set(None)
                    attr:title="Dismiss"
                >
                    "×"
                </Button>
            </Alert>
        </Show>
    }
}
