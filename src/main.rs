//! Main module for the tag sidebar page using Yew.
//! Wires the data store, URL state, and view components.

use std::rc::Rc;
use tag_sidebar::fetch::{page_base_path, WebFetch};
use tag_sidebar::store::{DataStore, Snapshot};
use tag_sidebar::{filter_apps, resolve_category, resources, urlstate};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

mod components;
mod config;

use components::{render_cards, render_status, CategorySidebar};
use config::SITE_ROOT;

type Store = DataStore<WebFetch>;

// ──────────────────────────────────────────────────────────────────────────────
// Browser glue

/// `location.search` of the current page, or empty.
fn current_search() -> String {
    gloo_utils::window().location().search().unwrap_or_default()
}

/// Replace the visible query string without adding a history entry.
/// Used to strip the one-shot refresh flag after honoring it.
fn replace_visible_query(query: &str) {
    let window = gloo_utils::window();
    let pathname = window.location().pathname().unwrap_or_default();
    let url = format!("{}{}", pathname, query);
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&url));
    }
}

/// Push the selected category into the visible URL so the view is
/// linkable and survives a reload.
fn push_category_query(category: &str) {
    let window = gloo_utils::window();
    let pathname = window.location().pathname().unwrap_or_default();
    let encoded = js_sys::encode_uri_component(category);
    let url = format!("{}?{}={}", pathname, resources::CATEGORY_PARAM, encoded);
    if let Ok(history) = window.history() {
        let _ = history.push_state_with_url(&JsValue::NULL, "", Some(&url));
    }
}

// ──────────────────────────────────────────────────────────────────────────────

/// Primary page component wiring the store, URL state, and views.
#[function_component(Main)]
fn main_component() -> Html {
    let store: Rc<Store> = use_memo((), |_| {
        DataStore::new(WebFetch::from_current_page(SITE_ROOT))
    });
    let base_path: Rc<String> = use_memo((), |_| page_base_path(SITE_ROOT));

    let snapshot = use_state(|| None::<Snapshot>);
    let is_loading = use_state(|| true);
    let active_category = use_state(|| {
        urlstate::query_param(&current_search(), resources::CATEGORY_PARAM)
            .filter(|name| !name.is_empty())
    });

    // Initial load. A `refresh` flag in the query forces one
    // cache-busting reload and is then stripped from the visible URL;
    // every later render is served from the store's cache.
    {
        let store = store.clone();
        let snapshot = snapshot.clone();
        let is_loading = is_loading.clone();
        use_effect_with((), move |_| {
            let search = current_search();
            let wants_refresh = urlstate::has_param(&search, resources::REFRESH_PARAM);
            spawn_local(async move {
                let snap = if wants_refresh {
                    replace_visible_query(&urlstate::strip_param(
                        &search,
                        resources::REFRESH_PARAM,
                    ));
                    store.refresh().await
                } else {
                    store.ensure_loaded().await
                };
                snapshot.set(Some(snap));
                is_loading.set(false);
            });
            || ()
        });
    }

    let onselect = {
        let active_category = active_category.clone();
        Callback::from(move |title: String| {
            push_category_query(&title);
            active_category.set(Some(title));
        })
    };

    let body = match (&*snapshot, *is_loading) {
        (None, _) | (_, true) => render_status("Loading application categories…"),
        (Some(snap), false) => match snap.categories.clone() {
            // The categories fetch failed; nothing to build a sidebar
            // from, but the page itself stays up.
            None => render_status("Category data is unavailable right now."),
            Some(categories) => {
                let results_area = match active_category.as_deref() {
                    None => render_status("Select a category to browse applications."),
                    Some(name) => match resolve_category(&categories, name) {
                        None => render_status(&format!("No category named \"{}\".", name)),
                        Some(category) => {
                            let hits = filter_apps(Some(category), snap.app_cards.as_deref());
                            html! {
                                <>
                                    <h2 class="tag-results-title">
                                        { format!("{} ({})", category.title, hits.len()) }
                                    </h2>
                                    { render_cards(&hits, &base_path) }
                                </>
                            }
                        }
                    },
                };

                html! {
                    <div class="md-main__inner tag-page">
                        <CategorySidebar
                            categories={categories}
                            active={(*active_category).clone()}
                            onselect={onselect.clone()}
                        />
                        <div class="tag-results">{ results_area }</div>
                    </div>
                }
            }
        },
    };

    html! {
        <div class="tag-page-root">{ body }</div>
    }
}

/// Entry point: sets the panic hook and mounts the page component.
fn main() {
    console_error_panic_hook::set_once();
    yew::Renderer::<Main>::new().render();
}
