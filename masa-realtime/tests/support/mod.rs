use chrono::Utc;
use masa_data::{RequestStatus, RequestType, ServiceRequest};
use uuid::Uuid;

pub fn request(organization_id: Uuid, status: RequestStatus) -> ServiceRequest {
    ServiceRequest {
        id: Uuid::new_v4(),
        organization_id,
        table_id: Uuid::new_v4(),
        request_type: RequestType::CallWaiter,
        status,
        message: None,
        session_id: None,
        created_at: Utc::now(),
        acknowledged_at: None,
        completed_at: None,
        handled_by: None,
    }
}

pub fn with_status(row: &ServiceRequest, status: RequestStatus) -> ServiceRequest {
    let mut next = row.clone();
    next.status = status;
    next
}
