use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::countries::Catalog;
use crate::data::CountryRecord;

#[derive(Debug, Clone, Default)]
pub enum Selection {
    #[default]
    None,
    Country(Rc<CountryRecord>),
}

impl Selection {
    pub fn record(&self) -> Option<&Rc<CountryRecord>> {
        match self {
            Selection::None => None,
            Selection::Country(record) => Some(record),
        }
    }
}

type Subscriber = Box<dyn Fn(&Selection)>;

/// Holds the current selection and tells subscribers whenever it is set.
#[derive(Default)]
pub struct SelectionModel {
    current: RefCell<Selection>,
    subscribers: RefCell<Vec<Subscriber>>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Selection {
        self.current.borrow().clone()
    }

    pub fn connect_changed<F: Fn(&Selection) + 'static>(&self, callback: F) {
        self.subscribers.borrow_mut().push(Box::new(callback));
    }

    /// Resolves a choice from the option list. An empty name clears the
    /// selection, as does a name that is not in the catalog.
    pub fn choose(&self, catalog: &Catalog, name: &str) {
        let selection = if name.is_empty() {
            Selection::None
        } else {
            match catalog.find(name) {
                Some(record) => Selection::Country(record),
                None => {
                    debug!(%name, "chosen country not in catalog");
                    Selection::None
                }
            }
        };
        self.set(selection);
    }

    pub fn clear(&self) {
        self.set(Selection::None);
    }

    fn set(&self, selection: Selection) {
        *self.current.borrow_mut() = selection.clone();
        for subscriber in self.subscribers.borrow().iter() {
            subscriber(&selection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::normalize;
    use crate::data::RawCountry;
    use std::cell::Cell;

    fn catalog(names: &[&str]) -> Catalog {
        let records = names
            .iter()
            .map(|name| {
                let raw: RawCountry = serde_json::from_value(serde_json::json!({ "name": { "common": name } })).unwrap();
                normalize(raw).unwrap()
            })
            .collect();
        let mut catalog = Catalog::default();
        catalog.replace(records);
        catalog
    }

    #[test]
    fn starts_without_selection() {
        assert!(SelectionModel::new().current().record().is_none());
    }

    #[test]
    fn choosing_present_name_selects_the_catalog_record() {
        let catalog = catalog(&["Japan", "Kenya"]);
        let model = SelectionModel::new();

        model.choose(&catalog, "Kenya");

        let selected = model.current().record().cloned().unwrap();
        assert!(Rc::ptr_eq(&selected, &catalog.find("Kenya").unwrap()));
    }

    #[test]
    fn choosing_absent_or_empty_name_clears() {
        let catalog = catalog(&["Japan", "Kenya"]);
        let model = SelectionModel::new();

        model.choose(&catalog, "Japan");
        model.choose(&catalog, "Atlantis");
        assert!(model.current().record().is_none());

        model.choose(&catalog, "Japan");
        model.choose(&catalog, "");
        assert!(model.current().record().is_none());

        model.choose(&catalog, "Kenya");
        model.clear();
        assert!(model.current().record().is_none());
    }

    #[test]
    fn subscribers_see_every_transition() {
        let catalog = catalog(&["Japan", "Kenya"]);
        let model = SelectionModel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let calls = Rc::new(Cell::new(0));

        let seen_clone = seen.clone();
        let calls_clone = calls.clone();
        model.connect_changed(move |selection| {
            calls_clone.set(calls_clone.get() + 1);
            seen_clone
                .borrow_mut()
                .push(selection.record().map(|r| r.name.clone()));
        });

        model.choose(&catalog, "Japan");
        model.choose(&catalog, "Kenya");
        model.choose(&catalog, "");

        assert_eq!(calls.get(), 3);
        assert_eq!(
            *seen.borrow(),
            vec![Some("Japan".to_string()), Some("Kenya".to_string()), None]
        );
    }
}
