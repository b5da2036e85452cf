use super::error::{ApiError, ApiResult};

pub fn unit_id(raw: &str) -> ApiResult<&str> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ApiError::Validation("unit id must not be empty".into()));
    }
    Ok(id)
}

pub fn coordinates(lat: f64, lng: f64) -> ApiResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::Validation(format!("latitude {} out of range", lat)));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::Validation(format!("longitude {} out of range", lng)));
    }
    Ok(())
}

pub fn finite(field: &str, value: Option<f64>) -> ApiResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(ApiError::Validation(format!("{} must be finite", field))),
        _ => Ok(()),
    }
}

pub fn radius(value: Option<f64>) -> ApiResult<()> {
    finite("radius_km", value)?;
    match value {
        Some(r) if r < 0.0 => Err(ApiError::Validation("radius_km must not be negative".into())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_rejects_blank_ids() {
        assert_eq!(unit_id(" drone-1 ").ok(), Some("drone-1"));
        assert!(unit_id("   ").is_err());
    }

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(coordinates(90.0, 180.0).is_ok());
        assert!(coordinates(-90.0, -180.0).is_ok());
        assert!(coordinates(90.5, 0.0).is_err());
        assert!(coordinates(0.0, -180.1).is_err());
        assert!(coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn radius_must_be_non_negative() {
        assert!(radius(None).is_ok());
        assert!(radius(Some(0.0)).is_ok());
        assert!(radius(Some(-1.0)).is_err());
        assert!(radius(Some(f64::INFINITY)).is_err());
    }
}
