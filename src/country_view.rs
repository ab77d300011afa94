use gtk::prelude::*;
use gtk::{glib, Label, Orientation, ScrolledWindow};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::countries::{apply_fetch_result, fetch_countries, Catalog, FetchError};
use crate::data::CountryRecord;
use crate::data::WORLD_LOGO_URL;
use crate::images::load_picture;
use crate::map_view::create_country_map;
use crate::selection::SelectionModel;

const PLACEHOLDER_OPTION: &str = "Select a country";

/// State owned by the country view and handed to everything below it.
#[derive(Default)]
pub struct AppState {
    pub catalog: RefCell<Catalog>,
    pub selection: SelectionModel,
}

struct DetailsPanel {
    container: gtk::Box,
    title: Label,
    flag: gtk::Picture,
    capital: Label,
    region: Label,
    subregion: Label,
    continent: Label,
    currency: Label,
    languages: Label,
}

pub fn create_country_view(settings: &Settings, client: &reqwest::Client) -> gtk::Box {
    let state = Rc::new(AppState::default());

    let container = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(12)
        .margin_top(12)
        .margin_bottom(12)
        .margin_start(12)
        .margin_end(12)
        .build();

    container.append(&create_header(client));

    // Choice control: placeholder first, country names appended once loaded
    let options = gtk::StringList::new(&[PLACEHOLDER_OPTION]);
    let dropdown = gtk::DropDown::builder()
        .model(&options)
        .hexpand(true)
        .build();

    let form_row = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(8)
        .build();
    let form_label = Label::builder()
        .label("Select Country:")
        .xalign(0.0)
        .build();
    form_row.append(&form_label);
    form_row.append(&dropdown);
    container.append(&form_row);

    let details = create_details_panel();
    let map = create_country_map(settings, client, &state.selection);

    let paned = gtk::Paned::builder()
        .orientation(Orientation::Horizontal)
        .wide_handle(true)
        .vexpand(true)
        .visible(false)
        .build();

    let details_scrolled = ScrolledWindow::builder()
        .hscrollbar_policy(gtk::PolicyType::Never)
        .min_content_width(280)
        .child(&details.container)
        .build();

    paned.set_start_child(Some(&details_scrolled));
    paned.set_resize_start_child(false);
    paned.set_shrink_start_child(false);
    paned.set_end_child(Some(&map));
    paned.set_resize_end_child(true);
    paned.set_shrink_end_child(false);
    container.append(&paned);

    // Details follow the selection; the whole pane hides when nothing is chosen
    let current_flag = Rc::new(RefCell::new(String::new()));
    let client_for_flags = client.clone();
    let paned_weak = paned.downgrade();
    state.selection.connect_changed(move |selection| {
        let Some(paned) = paned_weak.upgrade() else {
            return;
        };
        let Some(record) = selection.record() else {
            paned.set_visible(false);
            details.flag.set_visible(false);
            current_flag.borrow_mut().clear();
            return;
        };

        details.title.set_label(&record.name);
        details.capital.set_label(&record.capital);
        details.region.set_label(&record.region);
        details.subregion.set_label(&record.subregion);
        details.continent.set_label(&record.continent);
        details.currency.set_label(&record.currency);
        details.languages.set_label(&record.languages);
        details.flag.set_alternative_text(Some(&format!("{} flag", record.name)));

        if *current_flag.borrow() != record.flag_url {
            *current_flag.borrow_mut() = record.flag_url.clone();
            details.flag.set_visible(false);
            let current_flag = current_flag.clone();
            load_picture(&client_for_flags, &details.flag, &record.flag_url, move |url| {
                *current_flag.borrow() == url
            });
        }

        paned.set_visible(true);
    });

    let state_for_choice = state.clone();
    dropdown.connect_selected_notify(move |dropdown| {
        let position = dropdown.selected();
        if position == 0 || position == gtk::INVALID_LIST_POSITION {
            state_for_choice.selection.clear();
            return;
        }

        let name = dropdown
            .selected_item()
            .and_downcast::<gtk::StringObject>()
            .map(|item| item.string().to_string())
            .unwrap_or_default();
        let catalog = state_for_choice.catalog.borrow();
        state_for_choice.selection.choose(&catalog, &name);
    });

    // One fetch per view. Nothing is applied if the view is gone by the time it resolves.
    let state_weak = Rc::downgrade(&state);
    let options_weak = options.downgrade();
    let client = client.clone();
    let url = settings.dataset_url.clone();
    glib::spawn_future_local(async move {
        let result = fetch_countries(&client, &url).await;

        let Some(names) = store_loaded_countries(&state_weak, result) else {
            return;
        };
        let Some(options) = options_weak.upgrade() else {
            return;
        };

        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        options.splice(1, options.n_items() - 1, &names);
    });

    container
}

/// Applies a finished fetch to the view state and returns the names for the
/// option list. `None` when the view is gone or the fetch failed.
fn store_loaded_countries(
    state: &Weak<AppState>,
    result: Result<Vec<CountryRecord>, FetchError>,
) -> Option<Vec<String>> {
    let Some(state) = state.upgrade() else {
        debug!("country view closed before dataset arrived");
        return None;
    };

    let mut catalog = state.catalog.borrow_mut();
    if !apply_fetch_result(&mut catalog, result) {
        return None;
    }
    if catalog.is_empty() {
        warn!("country dataset was empty");
    }
    debug!(count = catalog.len(), "populating country list");
    Some(catalog.names().map(str::to_string).collect())
}

fn create_header(client: &reqwest::Client) -> gtk::Box {
    let header = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(12)
        .halign(gtk::Align::Center)
        .build();

    let logo = gtk::Picture::builder()
        .width_request(48)
        .height_request(48)
        .can_shrink(true)
        .content_fit(gtk::ContentFit::Contain)
        .visible(false)
        .build();
    load_picture(client, &logo, WORLD_LOGO_URL, |_| true);

    let title = Label::builder()
        .label("Visit Today's World")
        .build();
    title.add_css_class("title-1");

    header.append(&logo);
    header.append(&title);
    header
}

fn create_details_panel() -> DetailsPanel {
    let container = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(8)
        .margin_end(12)
        .build();
    container.add_css_class("country-info");

    let title = Label::builder()
        .xalign(0.0)
        .wrap(true)
        .build();
    title.add_css_class("title-2");
    container.append(&title);

    let flag = gtk::Picture::builder()
        .height_request(120)
        .can_shrink(true)
        .content_fit(gtk::ContentFit::Contain)
        .halign(gtk::Align::Start)
        .visible(false)
        .build();
    flag.add_css_class("country-flag");
    container.append(&flag);

    let field = |caption: &str| {
        let row = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .build();
        let caption_label = Label::builder()
            .label(caption)
            .xalign(0.0)
            .build();
        caption_label.add_css_class("heading");
        let value = Label::builder()
            .xalign(0.0)
            .wrap(true)
            .selectable(true)
            .build();
        row.append(&caption_label);
        row.append(&value);
        container.append(&row);
        value
    };

    let capital = field("Capital:");
    let region = field("Region:");
    let subregion = field("Subregion:");
    let continent = field("Continent:");
    let currency = field("Currency:");
    let languages = field("Languages:");

    DetailsPanel {
        container,
        title,
        flag,
        capital,
        region,
        subregion,
        continent,
        currency,
        languages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::parse_dataset;

    fn dataset() -> Vec<CountryRecord> {
        parse_dataset(r#"[{"name": {"common": "Togo"}}, {"name": {"common": "Benin"}}]"#).unwrap()
    }

    #[test]
    fn loaded_countries_fill_the_catalog() {
        let state = Rc::new(AppState::default());

        let names = store_loaded_countries(&Rc::downgrade(&state), Ok(dataset())).unwrap();

        assert_eq!(names, ["Benin", "Togo"]);
        assert!(state.catalog.borrow().find("Togo").is_some());
    }

    #[test]
    fn result_is_discarded_once_the_view_is_gone() {
        let state = Rc::new(AppState::default());
        let weak = Rc::downgrade(&state);
        drop(state);

        assert!(store_loaded_countries(&weak, Ok(dataset())).is_none());
    }

    #[test]
    fn failed_fetch_keeps_the_option_list_empty() {
        let state = Rc::new(AppState::default());
        let failure = parse_dataset("<html>").unwrap_err();

        assert!(store_loaded_countries(&Rc::downgrade(&state), Err(failure)).is_none());
        assert!(state.catalog.borrow().is_empty());

        state.selection.choose(&state.catalog.borrow(), "Togo");
        assert!(state.selection.current().record().is_none());
    }
}
