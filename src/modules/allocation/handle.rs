use actix_web::{post, web};
use serde::Deserialize;

use crate::{
    api::{error, success},
    modules::allocation::{
        repository_pg::AllocationRepositoryPg,
        service::{AllocationRunSummary, AllocationService},
    },
};

pub type AllocationSvc = AllocationService<AllocationRepositoryPg>;

#[derive(Deserialize)]
pub struct RunAllocationBody {
    /// Defaults to the current month when omitted.
    pub billing_period: Option<String>,
}

#[post("/run")]
pub async fn run_allocation(
    allocation_service: web::Data<AllocationSvc>,
    body: web::Json<RunAllocationBody>,
) -> Result<success::Success<AllocationRunSummary>, error::Error> {
    let summary = allocation_service.run_period(body.billing_period.clone()).await?;

    Ok(success::Success::ok(Some(summary)).message("Allocation run completed"))
}
