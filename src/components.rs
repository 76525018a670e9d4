//! Pure Yew view components for the tag sidebar page.
//!
//! Stateless views over plain data produced by the library; all data
//! loading and filtering happens in the caller.

use std::rc::Rc;
use tag_sidebar::{AppCard, Category};
use yew::prelude::*;

/// Sidebar listing the primary categories, sorted by title.
#[derive(Properties, PartialEq)]
pub struct CategorySidebarProps {
    pub categories: Rc<Vec<Category>>,
    /// Title of the currently selected category, if any.
    pub active: Option<String>,
    pub onselect: Callback<String>,
}

#[function_component(CategorySidebar)]
pub fn category_sidebar(props: &CategorySidebarProps) -> Html {
    let mut primary: Vec<&Category> = props.categories.iter().filter(|c| c.is_primary).collect();
    primary.sort_by(|a, b| a.title.cmp(&b.title));

    html! {
        <div class="tag-sidebar">
            <div class="tag-sidebar-content">
                <h2>{ crate::config::SIDEBAR_TITLE }</h2>
                <ul class="tag-category-list md-nav__list">
                    { primary.iter().map(|category| {
                        let is_active = props.active.as_deref().map_or(false, |active| {
                            active.to_lowercase() == category.title.to_lowercase()
                        });
                        render_category_item(category, is_active, props.onselect.clone())
                    }).collect::<Html>() }
                </ul>
            </div>
        </div>
    }
}

/// Renders one category entry: icon, title, and pre-computed app count.
fn render_category_item(category: &Category, active: bool, onselect: Callback<String>) -> Html {
    let title = category.title.clone();
    let onclick = Callback::from(move |e: MouseEvent| {
        e.prevent_default();
        onselect.emit(title.clone());
    });
    let class = if active {
        "tag-category-item md-nav__item tag-category-item--active"
    } else {
        "tag-category-item md-nav__item"
    };

    html! {
        <li class={class}>
            <div class="tag-category-header md-nav__link" {onclick}>
                <span class="material-icons tag-category-icon">{ category.icon.clone() }</span>
                <span class="tag-category-title">{ category.title.clone() }</span>
                <span class="tag-category-count">{ format!("({})", category.count) }</span>
            </div>
        </li>
    }
}

/// Renders the card grid for one category's filter results.
pub fn render_cards(results: &[(&str, &AppCard)], base_path: &str) -> Html {
    if results.is_empty() {
        return html! {
            <div class="app-card-grid">
                <p class="no-results-message">{ "No applications in this category." }</p>
            </div>
        };
    }

    html! {
        <div class="app-card-grid">
            { results.iter().map(|(key, card)| render_card(key, card, base_path)).collect::<Html>() }
        </div>
    }
}

fn render_card(key: &str, card: &AppCard, base_path: &str) -> Html {
    let href = format!("{}{}", base_path, card.target_path);

    html! {
        <a class="app-card" key={key.to_string()} href={href}>
            { if let Some(image) = &card.image_url {
                html! { <img class="app-card-image" src={image.clone()} alt={card.title.clone()} /> }
            } else {
                html! {}
            } }
            <div class="app-card-body">
                <h3 class="app-card-title">{ card.title.clone() }</h3>
                { if !card.vendor.is_empty() {
                    html! { <span class="app-card-vendor">{ card.vendor.clone() }</span> }
                } else {
                    html! {}
                } }
                <p class="app-card-description">{ card.description.clone() }</p>
                <div class="app-card-tags">
                    { card.tags.iter().map(|tag| {
                        html! { <span class="app-card-tag">{ tag.clone() }</span> }
                    }).collect::<Html>() }
                </div>
            </div>
        </a>
    }
}

/// Status banner for the loading / missing-data / no-match states.
pub fn render_status(message: &str) -> Html {
    html! {
        <div class="tag-status-message">
            <p>{ message.to_string() }</p>
        </div>
    }
}
