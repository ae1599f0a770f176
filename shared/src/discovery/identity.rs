use uuid::Uuid;

/// Build a registration id that is unique across live instances of the same
/// service, including restarts: `{service_name}-{uuid v4}`.
pub fn generate_instance_id(service_name: &str) -> String {
    format!("{}-{}", service_name, Uuid::new_v4())
}
