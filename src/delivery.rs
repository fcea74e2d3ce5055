use crate::models::Country;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// One courier option for a country.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOption {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub time: String,
}

/// Static country -> courier pricing table, built once at startup and
/// immutable afterwards.
#[derive(Debug)]
pub struct DeliveryTable {
    options: HashMap<Country, Vec<DeliveryOption>>,
}

fn option(id: &str, name: &str, price: u32, time: &str) -> DeliveryOption {
    DeliveryOption {
        id: id.to_string(),
        name: name.to_string(),
        price: Decimal::from(price),
        time: time.to_string(),
    }
}

impl DeliveryTable {
    pub fn new() -> Self {
        let mut options = HashMap::new();

        options.insert(
            Country::Hrvatska,
            vec![
                option("hp", "Hrvatska Pošta", 20, "2-3 radna dana"),
                option("tisak", "Tisak Dostava", 15, "1-2 radna dana"),
            ],
        );
        options.insert(
            Country::Slovenija,
            vec![option("posta", "Pošta Slovenije", 25, "3-4 radna dana")],
        );
        options.insert(
            Country::Srbija,
            vec![option("post", "Post Express", 30, "3-4 radna dana")],
        );
        options.insert(
            Country::BosnaIHercegovina,
            vec![option("bh-post", "BH Pošta", 30, "3-4 radna dana")],
        );

        Self { options }
    }

    /// Courier options for a country, in display order.
    pub fn options_for(&self, country: Country) -> &[DeliveryOption] {
        self.options
            .get(&country)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn lookup(&self, country: Country, method_id: &str) -> Option<&DeliveryOption> {
        self.options_for(country)
            .iter()
            .find(|option| option.id == method_id)
    }

    /// Fee for the selected courier. An unknown method id for the country
    /// yields a zero fee rather than failing the checkout.
    pub fn fee_for(&self, country: Country, method_id: &str) -> Decimal {
        match self.lookup(country, method_id) {
            Some(option) => option.price,
            None => {
                warn!(
                    country = country.display_name(),
                    method_id, "unknown delivery method, defaulting fee to 0"
                );
                Decimal::ZERO
            }
        }
    }

    pub fn all(&self) -> &HashMap<Country, Vec<DeliveryOption>> {
        &self.options
    }
}

impl Default for DeliveryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn every_country_has_at_least_one_option() {
        let table = DeliveryTable::new();
        for country in Country::ALL {
            assert!(
                !table.options_for(country).is_empty(),
                "no couriers for {country}"
            );
        }
    }

    #[test]
    fn lookup_finds_known_couriers() {
        let table = DeliveryTable::new();

        let hp = table.lookup(Country::Hrvatska, "hp").unwrap();
        assert_eq!(hp.name, "Hrvatska Pošta");
        assert_eq!(hp.price, dec!(20));

        let tisak = table.lookup(Country::Hrvatska, "tisak").unwrap();
        assert_eq!(tisak.price, dec!(15));

        assert_eq!(
            table.lookup(Country::Srbija, "post").unwrap().price,
            dec!(30)
        );
    }

    #[test]
    fn courier_ids_are_country_scoped() {
        let table = DeliveryTable::new();
        // "hp" only ships within Hrvatska
        assert!(table.lookup(Country::Slovenija, "hp").is_none());
    }

    #[test]
    fn unknown_method_falls_back_to_zero_fee() {
        let table = DeliveryTable::new();
        assert_eq!(table.fee_for(Country::Hrvatska, "gls"), Decimal::ZERO);
        assert_eq!(table.fee_for(Country::Slovenija, "hp"), Decimal::ZERO);
    }
}
