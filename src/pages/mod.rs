use crate::components::sidebar::NoteList;
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Notice};
use crate::config::StorageBackendKind;
use crate::controller::Direction;
use crate::state::AppContext;
use crate::transfer::read_file_text;
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos_dom::helpers::window_event_listener;

pub(crate) const EDITOR_PLACEHOLDER: &str = "Select or create a note to start writing...";

/// Editable body of the open note. The DOM is only rewritten when a different note opens,
/// so typing never resets the caret.
#[component]
fn NoteEditor() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let state = app_state.0;

    let editor_ref: NodeRef<html::Div> = NodeRef::new();
    let current = Memo::new(move |_| state.session.with(|s| s.current_note.clone()));

    Effect::new(move |_| {
        let Some(el) = editor_ref.get() else {
            return;
        };
        let content = current.get().and_then(|id| {
            state
                .collection
                .with_untracked(|c| c.notes.get(&id).map(|n| n.content.clone()))
        });
        el.set_inner_html(content.as_deref().unwrap_or_default());
        if content.is_some() {
            let _ = el.focus();
        }
    });

    let on_input = move |_| {
        let Some(id) = current.get_untracked() else {
            return;
        };
        if let Some(el) = editor_ref.get_untracked() {
            state.set_note_content(&id, el.inner_html());
        }
    };

    let has_note = move || current.with(|c| c.is_some());

    view! {
        <div class="relative min-h-[60vh] flex-1 rounded-lg border bg-background">
            <Show when=move || !has_note()>
                <div class="pointer-events-none absolute inset-0 flex items-center justify-center text-sm text-muted-foreground">
                    {EDITOR_PLACEHOLDER}
                </div>
            </Show>
            <div
                data-name="NoteEditor"
                class="prose h-full min-h-[60vh] max-w-none p-6 text-sm outline-none"
                contenteditable=move || { if has_note() { "true" } else { "false" } }
                node_ref=editor_ref
                on:input=on_input
            ></div>
        </div>
    }
}

#[component]
pub fn NotesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let state = app_state.0;
    let sidebar_collapsed = state.sidebar_collapsed;

    let file_ref: NodeRef<html::Input> = NodeRef::new();

    // Pending snapshot must land before the page goes away.
    let _pagehide_handle =
        window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
            state.flush();
        });

    // Keyboard shortcuts:
    // - Cmd/Ctrl+B: toggle sidebar
    // - Cmd/Ctrl+ArrowUp/ArrowDown: move the focused note (or the group being renamed)
    let _key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if !(ev.meta_key() || ev.ctrl_key()) {
            return;
        }
        let direction = match ev.key().as_str() {
            "b" | "B" => {
                ev.prevent_default();
                state.toggle_sidebar();
                return;
            }
            "ArrowUp" => Direction::Up,
            "ArrowDown" => Direction::Down,
            _ => return,
        };
        if state.step_focused(direction) {
            ev.prevent_default();
        }
    });

    let on_pick_import = move |_| {
        if let Some(input) = file_ref.get_untracked() {
            input.click();
        }
    };

    let on_import_file = move |_| {
        let Some(input) = file_ref.get_untracked() else {
            return;
        };
        let Some(file) = input.files().and_then(|f| f.get(0)) else {
            return;
        };
        // Allow picking the same file again.
        input.set_value("");
        if let Err(e) = read_file_text(file, move |text| state.import_text(text)) {
            state.notice.set(Some(e));
        }
    };

    let storage_label = move || {
        state.config.with_value(|c| match c.storage_backend {
            StorageBackendKind::Local => format!("Saved in this browser ({})", c.storage_key),
            StorageBackendKind::Memory => "In-memory only: changes are lost on reload".to_string(),
        })
    };

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <div class="mx-auto flex min-h-screen w-full max-w-6xl gap-4 px-4 py-6">
                <aside class=move || {
                    format!(
                        "{} shrink-0 flex-col gap-3",
                        if sidebar_collapsed.get() { "hidden" } else { "flex w-72" },
                    )
                }>
                    <div class="flex flex-wrap gap-2">
                        <Button size=ButtonSize::Sm on:click=move |_| { state.create_note(); }>
                            "New note"
                        </Button>
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            on:click=move |_| { state.create_group(); }
                        >
                            "New group"
                        </Button>
                        <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=on_pick_import>
                            "Import"
                        </Button>
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Sm
                            on:click=move |_| state.export()
                        >
                            "Export"
                        </Button>
                        <input
                            class="hidden"
                            type="file"
                            accept=".json,application/json"
                            node_ref=file_ref
                            on:change=on_import_file
                        />
                    </div>

                    <NoteList />

                    <div class="text-xs text-muted-foreground">{storage_label}</div>
                </aside>

                <main class="flex min-w-0 flex-1 flex-col">
                    <div class="mb-3 flex items-center gap-2">
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Icon
                            attr:title="Toggle sidebar (Ctrl+B)"
                            on:click=move |_| state.toggle_sidebar()
                        >
                            <span class="text-xs text-muted-foreground">
                                {move || if sidebar_collapsed.get() { ">" } else { "<" }}
                            </span>
                        </Button>
                        <span class="text-sm font-medium">"Notes"</span>
                    </div>
                    <Notice notice=state.notice />
                    <NoteEditor />
                </main>
            </div>
        </div>
    }
}
