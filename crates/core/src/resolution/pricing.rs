use crate::domain::quote::QuotePricing;
use crate::domain::tariff::TariffRule;

/// Field mapping only. The configured price is carried as-is: markup, tax
/// and rounding belong to a separate pricing policy layer.
pub fn project(rule: &TariffRule, currency: &str) -> QuotePricing {
    QuotePricing {
        price: rule.price(),
        currency: currency.to_owned(),
        service_type: rule.service_type().to_owned(),
        delivery_type: rule.delivery_type().to_owned(),
        fare_name: rule.fare_name().to_owned(),
        parcel_type: rule.parcel_type().to_owned(),
        payment_forms: rule.payment_forms().iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::project;
    use crate::domain::tariff::{RuleStatus, TariffRule, TariffRuleRecord};

    #[test]
    fn price_is_carried_verbatim_with_metadata() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let rule = TariffRule::try_from(TariffRuleRecord {
            id: "T-9".to_owned(),
            origin: Some("Santiago".to_owned()),
            destination: Some("Antofagasta".to_owned()),
            weight_from: Decimal::ZERO,
            weight_to: Decimal::from(30),
            service_type: "Express".to_owned(),
            parcel_type: "Bolsa".to_owned(),
            fare_name: "Tarifa Pullman Nueva".to_owned(),
            delivery_type: "Domicilio".to_owned(),
            price: Decimal::new(1_234_567, 3),
            payment_forms: vec!["Por Pagar".to_owned(), "Contado".to_owned()],
            valid_from: at,
            valid_to: at,
            status: RuleStatus::Active,
            created_at: at,
            updated_at: at,
        })
        .expect("valid rule");

        let pricing = project(&rule, "CLP");

        assert_eq!(pricing.price, Decimal::new(1_234_567, 3));
        assert_eq!(pricing.price.scale(), 3);
        assert_eq!(pricing.currency, "CLP");
        assert_eq!(pricing.service_type, "Express");
        assert_eq!(pricing.delivery_type, "Domicilio");
        assert_eq!(pricing.fare_name, "Tarifa Pullman Nueva");
        assert_eq!(pricing.payment_forms, vec!["CONTADO".to_owned(), "POR PAGAR".to_owned()]);
    }
}
