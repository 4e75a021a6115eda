use leptos::html;
use leptos::prelude::*;
use tw_merge::tw_merge;

/// Inline text field for renaming a group.
///
/// Enter and blur commit, Escape reverts. The field grabs focus when mounted.
#[component]
pub fn TitleInput(
    #[prop(into, optional)] class: String,
    #[prop(into)] initial: String,
    #[prop(into)] on_commit: Callback<String>,
    #[prop(into)] on_cancel: Callback<()>,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "placeholder:text-muted-foreground selection:bg-primary selection:text-primary-foreground border-input h-7 w-full min-w-0 rounded-md border bg-transparent px-2 text-sm shadow-xs outline-none",
        "focus-visible:border-ring focus-visible:ring-ring/50 focus-visible:ring-2",
        class
    );

    let input_ref: NodeRef<html::Input> = NodeRef::new();
    // Enter/Escape already settled the edit; the blur that follows must not commit again.
    let settled = StoredValue::new(false);

    Effect::new(move |_| {
        if let Some(input) = input_ref.get() {
            let _ = input.focus();
            input.select();
        }
    });

    let commit = move || {
        if settled.get_value() {
            return;
        }
        settled.set_value(true);
        let value = input_ref.get().map(|i| i.value()).unwrap_or_default();
        on_commit.run(value);
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| match ev.key().as_str() {
        "Enter" => {
            ev.prevent_default();
            commit();
        }
        "Escape" => {
            ev.prevent_default();
            if !settled.get_value() {
                settled.set_value(true);
                on_cancel.run(());
            }
        }
        _ => {}
    };

    view! {
        <input
            data-name="TitleInput"
            type="text"
            class=merged_class
            value=initial
            placeholder="Group title"
            node_ref=input_ref
            on:keydown=on_keydown
            on:blur=move |_| commit()
            on:click=move |ev| ev.stop_propagation()
            on:dblclick=move |ev| ev.stop_propagation()
        />
    }
}
