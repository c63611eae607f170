use crate::core::correlator::QueryCorrelator;
use crate::domain::views::{
    ChargeView, PartyView, RestrictionView, SaleAgreementView, TitleSummaryView,
};
use crate::utils::error::Result;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn me(State(correlator): State<QueryCorrelator>) -> Result<Json<Value>> {
    let me = correlator.ledger().node_identity().await?;
    Ok(Json(json!({"me": PartyView::from(&me)})))
}

/// Every identity on the network map except this node.
pub async fn peers(State(correlator): State<QueryCorrelator>) -> Result<Json<Value>> {
    let ledger = correlator.ledger();
    let me = ledger.node_identity().await?;
    let peers: Vec<PartyView> = ledger
        .network_peers()
        .await?
        .iter()
        .filter(|party| **party != me)
        .map(PartyView::from)
        .collect();
    Ok(Json(json!({"peers": peers})))
}

pub async fn list_titles(
    State(correlator): State<QueryCorrelator>,
) -> Result<Json<Vec<TitleSummaryView>>> {
    tracing::info!("GET /titles");
    Ok(Json(correlator.build_all_title_summaries().await?))
}

pub async fn get_title(
    State(correlator): State<QueryCorrelator>,
    Path(title_number): Path<String>,
) -> Result<Json<TitleSummaryView>> {
    tracing::info!("GET /titles/{}", title_number);
    Ok(Json(correlator.build_title_summary(&title_number).await?))
}

pub async fn get_sales_agreement(
    State(correlator): State<QueryCorrelator>,
    Path(title_number): Path<String>,
) -> Result<Json<SaleAgreementView>> {
    tracing::info!("GET /titles/{}/sales-agreement", title_number);
    Ok(Json(
        correlator.build_sale_agreement_view(&title_number).await?,
    ))
}

pub async fn get_charges(
    State(correlator): State<QueryCorrelator>,
    Path(title_number): Path<String>,
) -> Result<Json<Vec<ChargeView>>> {
    tracing::info!("GET /titles/{}/charges", title_number);
    Ok(Json(correlator.build_charges_view(&title_number).await?))
}

#[derive(Debug, Deserialize)]
pub struct RestrictionFilter {
    #[serde(rename = "type")]
    pub restriction_type: Option<String>,
}

pub async fn get_restrictions(
    State(correlator): State<QueryCorrelator>,
    Path(title_number): Path<String>,
    Query(filter): Query<RestrictionFilter>,
) -> Result<Json<Vec<RestrictionView>>> {
    tracing::info!("GET /titles/{}/restrictions", title_number);
    Ok(Json(
        correlator
            .build_restrictions_view(&title_number, filter.restriction_type.as_deref())
            .await?,
    ))
}
