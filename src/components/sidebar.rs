use crate::components::ui::{Button, ButtonSize, ButtonVariant, TitleInput};
use crate::controller::{DragSource, DropTarget, HoverSurface, Placement};
use crate::models::{GroupId, NoteId};
use crate::render::{find_group, find_note, project, EntryKey, ListEntry};
use crate::state::{AppContext, AppState};
use icons::{ChevronDown, ChevronRight};
use leptos::prelude::*;
use wasm_bindgen::JsCast;

/// Where the pointer sits relative to the element the listener is attached to.
fn pointer_placement(ev: &web_sys::DragEvent) -> Placement {
    ev.current_target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            Placement::from_pointer(f64::from(ev.client_y()), rect.top(), rect.height())
        })
        .unwrap_or(Placement::After)
}

fn mark_move(ev: &web_sys::DragEvent, payload: &str) {
    if let Some(dt) = ev.data_transfer() {
        // Firefox will not start a drag without data.
        let _ = dt.set_data("text/plain", payload);
        dt.set_effect_allowed("move");
    }
}

/// A surface that handles the current drag keeps the event to itself, even when it
/// rejects the drop; only an accepting surface lets the browser drop here.
fn route_dragover(ev: &web_sys::DragEvent, outcome: Option<bool>) {
    if let Some(accepted) = outcome {
        ev.stop_propagation();
        if accepted {
            ev.prevent_default();
        }
    }
}

fn indicator_class(placement: Option<Placement>) -> &'static str {
    match placement {
        Some(Placement::Before) => "border-t-2 border-t-primary",
        Some(Placement::After) => "border-b-2 border-b-primary",
        None => "border-y-2 border-y-transparent",
    }
}

/// Notes and groups, in display order. The list background accepts notes dropped into the
/// ungrouped area.
///
/// Rows are keyed by id and read their own slice of the projection, so an edit only touches
/// the rows it changes and an open rename field is never remounted.
#[component]
pub fn NoteList() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let state = app_state.0;

    let entries =
        Memo::new(move |_| state.collection.with(|c| state.session.with(|s| project(c, s))));

    let dropping_ungrouped =
        move || state.drag.with(|d| matches!(d.target(), Some(DropTarget::Ungrouped)));

    let on_dragover = move |ev: web_sys::DragEvent| {
        route_dragover(&ev, state.hover_drag(HoverSurface::Container, Placement::After));
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        state.drop_drag();
    };

    view! {
        <div
            data-name="NoteList"
            class=move || {
                format!(
                    "flex min-h-40 flex-1 flex-col gap-0.5 overflow-y-auto rounded-md pb-8 {}",
                    if dropping_ungrouped() { "bg-accent/40" } else { "" },
                )
            }
            on:dragover=on_dragover
            on:drop=on_drop
        >
            <Show when=move || entries.with(|l| l.is_empty())>
                <div class="px-2 py-4 text-xs text-muted-foreground">"No notes yet"</div>
            </Show>
            <For
                each=move || entries.with(|l| l.iter().map(ListEntry::key).collect::<Vec<_>>())
                key=|k| k.clone()
                children=move |k: EntryKey| match k {
                    EntryKey::Group(id) => view! { <GroupRow id=id entries=entries /> }.into_any(),
                    EntryKey::Note(id) => view! { <NoteRow id=id entries=entries /> }.into_any(),
                }
            />
        </div>
    }
}

#[component]
fn NoteRow(id: NoteId, entries: Memo<Vec<ListEntry>>) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let state: AppState = app_state.0;

    let id = StoredValue::new(id);
    let entry = Memo::new(move |_| entries.with(|l| id.with_value(|i| find_note(l, i).cloned())));
    let title = move || entry.with(|e| e.as_ref().map(|e| e.title.clone()).unwrap_or_default());
    let open = move || entry.with(|e| e.as_ref().is_some_and(|e| e.open));

    let indicator = move || {
        state.drag.with(|d| match d.target() {
            Some(DropTarget::BesideNote { note, placement }) if id.with_value(|i| i == note) => {
                Some(*placement)
            }
            _ => None,
        })
    };

    let on_dragstart = move |ev: web_sys::DragEvent| {
        ev.stop_propagation();
        let note = id.get_value();
        if state.begin_drag(DragSource::Note(note.clone())) {
            mark_move(&ev, note.as_str());
        } else {
            ev.prevent_default();
        }
    };

    let on_dragover = move |ev: web_sys::DragEvent| {
        let placement = pointer_placement(&ev);
        route_dragover(&ev, state.hover_drag(HoverSurface::Note(id.get_value()), placement));
    };

    let row_class = move || {
        format!(
            "group/note flex cursor-pointer items-center gap-2 rounded-md px-2 py-1 text-sm {} {}",
            if open() {
                "bg-accent text-accent-foreground font-medium"
            } else {
                "hover:bg-accent/50"
            },
            indicator_class(indicator()),
        )
    };

    view! {
        <div
            data-note-id=id.get_value().to_string()
            class=row_class
            draggable=move || { if state.session.with(|s| s.can_drag()) { "true" } else { "false" } }
            on:click=move |_| state.open_note(&id.get_value())
            on:dragstart=on_dragstart
            on:dragover=on_dragover
            on:dragend=move |_| state.cancel_drag()
        >
            <span class="flex-1 truncate">{title}</span>
            <Button
                variant=ButtonVariant::Destructive
                size=ButtonSize::Icon
                class="opacity-0 group-hover/note:opacity-100"
                attr:title="Delete note"
                on:click=move |ev: web_sys::MouseEvent| {
                    ev.stop_propagation();
                    state.delete_note(&id.get_value());
                }
            >
                "×"
            </Button>
        </div>
    }
}

#[component]
fn GroupRow(id: GroupId, entries: Memo<Vec<ListEntry>>) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let state: AppState = app_state.0;

    let id: StoredValue<GroupId> = StoredValue::new(id);
    let group = Memo::new(move |_| entries.with(|l| id.with_value(|i| find_group(l, i).cloned())));
    let title = Memo::new(move |_| {
        group.with(|g| g.as_ref().map(|g| g.title.clone()).unwrap_or_default())
    });
    let collapsed = Memo::new(move |_| group.with(|g| g.as_ref().is_some_and(|g| g.collapsed)));
    let renaming = Memo::new(move |_| group.with(|g| g.as_ref().is_some_and(|g| g.renaming)));
    let member_count = move || group.with(|g| g.as_ref().map_or(0, |g| g.member_count));
    let member_ids = Memo::new(move |_| {
        group.with(|g| {
            g.as_ref()
                .map(|g| g.notes.iter().map(|n| n.id.clone()).collect::<Vec<_>>())
                .unwrap_or_default()
        })
    });

    let target_here = move || {
        state.drag.with(|d| match d.target() {
            Some(DropTarget::IntoGroup(g)) if id.with_value(|i| i == g) => (true, None),
            Some(DropTarget::BesideGroup { group, placement }) if id.with_value(|i| i == group) => {
                (false, Some(*placement))
            }
            _ => (false, None),
        })
    };

    let on_dragstart = move |ev: web_sys::DragEvent| {
        let group = id.get_value();
        if state.begin_drag(DragSource::Group(group.clone())) {
            mark_move(&ev, group.as_str());
        } else {
            ev.prevent_default();
        }
    };

    let on_dragover = move |ev: web_sys::DragEvent| {
        let placement = pointer_placement(&ev);
        route_dragover(&ev, state.hover_drag(HoverSurface::Group(id.get_value()), placement));
    };

    let row_class = move || {
        let (into, beside) = target_here();
        format!(
            "flex flex-col rounded-md {} {}",
            if into { "bg-accent/60 ring-1 ring-primary/40" } else { "" },
            indicator_class(beside),
        )
    };

    // Only re-runs when the rename starts or ends.
    let header = move || {
        if renaming.get() {
            view! {
                <TitleInput
                    initial=title.get_untracked()
                    on_commit=move |value: String| state.commit_rename(&value)
                    on_cancel=move |_| state.cancel_rename()
                />
            }
            .into_any()
        } else {
            view! {
                <span
                    class="flex-1 truncate font-medium"
                    title="Double-click to rename"
                    on:dblclick=move |_| {
                        state.begin_rename(&id.get_value());
                    }
                >
                    {move || title.get()}
                </span>
            }
            .into_any()
        }
    };

    view! {
        <div
            data-group-id=id.get_value().to_string()
            class=row_class
            draggable=move || { if state.session.with(|s| s.can_drag()) { "true" } else { "false" } }
            on:dragstart=on_dragstart
            on:dragover=on_dragover
            on:dragend=move |_| state.cancel_drag()
        >
            <div class="group/header flex items-center gap-1 px-1 py-1 text-sm">
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title=move || { if collapsed.get() { "Expand group" } else { "Collapse group" } }
                    on:click=move |_| state.toggle_group(&id.get_value())
                >
                    {move || {
                        if collapsed.get() {
                            view! { <ChevronRight class="size-4" /> }.into_any()
                        } else {
                            view! { <ChevronDown class="size-4" /> }.into_any()
                        }
                    }}
                </Button>
                {header}
                <span class="text-xs text-muted-foreground">{member_count}</span>
                <Button
                    variant=ButtonVariant::Destructive
                    size=ButtonSize::Icon
                    class="opacity-0 group-hover/header:opacity-100"
                    attr:title="Delete group"
                    attr:disabled=move || renaming.get()
                    on:click=move |_| state.delete_group(&id.get_value())
                >
                    "×"
                </Button>
            </div>
            <div class="flex flex-col gap-0.5 pl-5">
                <For
                    each=move || member_ids.get()
                    key=|n| n.clone()
                    children=move |n: NoteId| view! { <NoteRow id=n entries=entries /> }
                />
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_class_matches_placement() {
        assert!(indicator_class(Some(Placement::Before)).contains("border-t-primary"));
        assert!(indicator_class(Some(Placement::After)).contains("border-b-primary"));
        assert!(indicator_class(None).contains("transparent"));
    }
}
