use crate::errors::ServiceError;
use crate::models::OrderDetails;
use rust_decimal::Decimal;
use validator::Validate;

/// Validate any input that implements the Validate trait, surfacing the
/// first localized field message.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|field| field.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Neispravni podaci".to_string());
        ServiceError::InvalidInput(message)
    })
}

/// Validate quantity is positive
pub fn validate_quantity(quantity: u32) -> Result<(), ServiceError> {
    if quantity == 0 {
        return Err(ServiceError::InvalidInput(
            "Količina mora biti najmanje 1".to_string(),
        ));
    }
    Ok(())
}

/// Validate the posted cart snapshot: non-empty, positive quantities, and
/// a subtotal that matches the items it claims to describe.
pub fn validate_order_details(order: &OrderDetails) -> Result<(), ServiceError> {
    if order.items.is_empty() {
        return Err(ServiceError::InvalidInput("Košarica je prazna".to_string()));
    }

    for item in &order.items {
        validate_quantity(item.quantity)?;
        if item.price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Cijena proizvoda nije ispravna".to_string(),
            ));
        }
    }

    let subtotal: Decimal = order.items.iter().map(|item| item.line_total()).sum();
    if subtotal != order.total_price {
        return Err(ServiceError::InvalidInput(
            "Iznos narudžbe ne odgovara artiklima u košarici".to_string(),
        ));
    }

    Ok(())
}
