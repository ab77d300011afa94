use gtk::prelude::*;
use gtk::{Label, Orientation, Popover};
use libshumate::prelude::{LocationExt, MapSourceExt, MarkerExt};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::data::{Coordinates, CountryRecord};
use crate::images::load_picture;
use crate::selection::{Selection, SelectionModel};

/// Anything whose visible center and zoom can be moved on command.
pub trait ViewportTarget {
    fn move_to(&self, center: Coordinates, zoom: f64);
}

impl ViewportTarget for libshumate::Map {
    fn move_to(&self, center: Coordinates, zoom: f64) {
        // go_to_full animates from the current position
        self.go_to_full(center.latitude, center.longitude, zoom);
    }
}

/// Keeps a viewport centered on the selected country.
///
/// One move is issued per change of selected record. The target is never
/// rebuilt; clearing the selection only forgets what was last shown so the
/// next pick moves the view again.
pub struct ViewportSync {
    target: Rc<dyn ViewportTarget>,
    zoom: f64,
    shown: RefCell<Option<Rc<CountryRecord>>>,
}

impl ViewportSync {
    pub fn new(target: Rc<dyn ViewportTarget>, zoom: f64) -> Rc<Self> {
        Rc::new(Self {
            target,
            zoom,
            shown: RefCell::new(None),
        })
    }

    pub fn attach(self: &Rc<Self>, model: &SelectionModel) {
        let sync = self.clone();
        model.connect_changed(move |selection| sync.follow(selection));
    }

    pub fn follow(&self, selection: &Selection) {
        let Some(record) = selection.record() else {
            *self.shown.borrow_mut() = None;
            return;
        };

        let already_shown = self
            .shown
            .borrow()
            .as_ref()
            .is_some_and(|shown| Rc::ptr_eq(shown, record));
        if already_shown {
            return;
        }

        debug!(
            country = %record.name,
            lat = record.coordinates.latitude,
            lon = record.coordinates.longitude,
            "moving viewport"
        );
        self.target.move_to(record.coordinates, self.zoom);
        *self.shown.borrow_mut() = Some(record.clone());
    }
}

/// Builds the map widget once: tile source, a single pin marker with a
/// name/capital popover, and a viewport that follows the selection.
pub fn create_country_map(settings: &Settings, client: &reqwest::Client, selection: &SelectionModel) -> libshumate::SimpleMap {
    let map = libshumate::SimpleMap::new();

    let map_source = libshumate::RasterRenderer::from_url(&settings.tile_url);
    map_source.set_license(&settings.tile_license);
    map.set_map_source(Some(&map_source));

    map.set_vexpand(true);
    map.set_hexpand(true);

    let Some(map_view) = map.map() else {
        warn!("map widget has no inner map, viewport will not follow selection");
        return map;
    };
    let Some(viewport) = map_view.viewport() else {
        warn!("map widget has no viewport, viewport will not follow selection");
        return map;
    };

    let marker_layer = libshumate::MarkerLayer::new(&viewport);
    map_view.add_layer(&marker_layer);

    let pin = gtk::Picture::builder()
        .width_request(25)
        .height_request(40)
        .can_shrink(true)
        .content_fit(gtk::ContentFit::Contain)
        .visible(false)
        .build();
    load_picture(client, &pin, &settings.marker_icon_url, |_| true);

    let marker_button = gtk::Button::builder()
        .child(&pin)
        .build();
    marker_button.add_css_class("flat");
    marker_button.add_css_class("map-marker");

    let popover_box = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(4)
        .margin_top(8)
        .margin_bottom(8)
        .margin_start(10)
        .margin_end(10)
        .build();
    let popover_name = Label::builder().xalign(0.0).build();
    popover_name.add_css_class("title-4");
    let popover_capital = Label::builder().xalign(0.0).build();
    popover_capital.add_css_class("dim-label");
    popover_box.append(&popover_name);
    popover_box.append(&popover_capital);

    let popover = Popover::builder()
        .child(&popover_box)
        .build();
    popover.add_css_class("map-popover");
    popover.set_parent(&marker_button);

    marker_button.connect_clicked(move |_| {
        popover.popup();
    });

    let marker = libshumate::Marker::new();
    marker.set_child(Some(&marker_button));
    marker.set_visible(false);
    marker_layer.add_marker(&marker);

    selection.connect_changed(move |selection| match selection.record() {
        Some(record) => {
            marker.set_location(record.coordinates.latitude, record.coordinates.longitude);
            marker.set_visible(true);
            popover_name.set_label(&record.name);
            popover_capital.set_label(&format!("Capital: {}", record.capital));
        }
        None => marker.set_visible(false),
    });

    let target: Rc<dyn ViewportTarget> = Rc::new(map_view);
    ViewportSync::new(target, settings.zoom_level).attach(selection);

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::Catalog;
    use crate::data::RawCountry;
    use std::cell::Cell;

    #[derive(Default)]
    struct RecordingViewport {
        moves: RefCell<Vec<(Coordinates, f64)>>,
    }

    impl ViewportTarget for RecordingViewport {
        fn move_to(&self, center: Coordinates, zoom: f64) {
            self.moves.borrow_mut().push((center, zoom));
        }
    }

    fn catalog() -> Catalog {
        let raw = |name: &str, lat: f64, lon: f64| -> RawCountry {
            serde_json::from_value(serde_json::json!({
                "name": { "common": name },
                "latlng": [lat, lon]
            }))
            .unwrap()
        };
        let records = vec![
            crate::countries::normalize(raw("Iceland", 65.0, -18.0)).unwrap(),
            crate::countries::normalize(raw("Nepal", 28.0, 84.0)).unwrap(),
        ];
        let mut catalog = Catalog::default();
        catalog.replace(records);
        catalog
    }

    fn setup(zoom: f64) -> (Rc<RecordingViewport>, SelectionModel) {
        let viewport = Rc::new(RecordingViewport::default());
        let model = SelectionModel::new();
        ViewportSync::new(viewport.clone(), zoom).attach(&model);
        (viewport, model)
    }

    #[test]
    fn switching_country_issues_one_move_to_new_center() {
        let catalog = catalog();
        let (viewport, model) = setup(5.0);

        model.choose(&catalog, "Iceland");
        assert_eq!(*viewport.moves.borrow(), vec![(Coordinates::new(65.0, -18.0), 5.0)]);

        model.choose(&catalog, "Nepal");
        let moves = viewport.moves.borrow();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[1], (Coordinates::new(28.0, 84.0), 5.0));
    }

    #[test]
    fn zoom_stays_fixed_across_selections() {
        let catalog = catalog();
        let (viewport, model) = setup(3.0);

        model.choose(&catalog, "Iceland");
        model.choose(&catalog, "Nepal");
        model.choose(&catalog, "Iceland");

        assert!(viewport.moves.borrow().iter().all(|(_, zoom)| *zoom == 3.0));
        assert_eq!(viewport.moves.borrow().len(), 3);
    }

    #[test]
    fn clearing_does_not_move_but_reselecting_does() {
        let catalog = catalog();
        let (viewport, model) = setup(5.0);

        model.choose(&catalog, "Nepal");
        model.choose(&catalog, "");
        assert_eq!(viewport.moves.borrow().len(), 1);

        model.choose(&catalog, "Nepal");
        assert_eq!(viewport.moves.borrow().len(), 2);
    }

    #[test]
    fn repeated_notification_for_same_record_is_ignored() {
        let catalog = catalog();
        let viewport = Rc::new(RecordingViewport::default());
        let sync = ViewportSync::new(viewport.clone(), 5.0);

        let selection = Selection::Country(catalog.find("Iceland").unwrap());
        sync.follow(&selection);
        sync.follow(&selection);

        assert_eq!(viewport.moves.borrow().len(), 1);
    }

    #[test]
    fn lookup_miss_leaves_viewport_alone() {
        let catalog = catalog();
        let (viewport, model) = setup(5.0);
        let notified = Rc::new(Cell::new(false));
        let notified_clone = notified.clone();
        model.connect_changed(move |_| notified_clone.set(true));

        model.choose(&catalog, "Narnia");

        assert!(notified.get());
        assert!(viewport.moves.borrow().is_empty());
    }
}
