//! Appointment source backed by the public CoWIN API.

use crate::aggregator::fan_in;
use crate::config::{CowinConfig, HttpConfig};
use crate::core::{Appointment, SlotSource, SourceError};
use crate::http::build_client;
use async_trait::async_trait;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, instrument};

/// Date format expected by the calendar endpoints.
const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct State {
    pub state_id: u32,
    pub state_name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct District {
    pub district_id: u32,
    pub district_name: String,
}

#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Vec<State>,
}

#[derive(Debug, Deserialize)]
struct DistrictsResponse {
    #[serde(default)]
    districts: Vec<District>,
}

#[derive(Debug, Deserialize)]
struct CentersResponse {
    #[serde(default)]
    centers: Vec<Center>,
}

/// A vaccination center with its upcoming sessions.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Center {
    pub center_id: i64,
    pub name: String,
    pub address: String,
    pub state_name: String,
    pub district_name: String,
    pub block_name: String,
    pub pincode: i64,
    pub from: String,
    pub to: String,
    pub fee_type: String,
    pub sessions: Vec<Session>,
}

/// One day of vaccinations at a center.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Session {
    pub session_id: String,
    pub date: String,
    pub available_capacity: i64,
    pub min_age_limit: u32,
    pub vaccine: String,
    pub slots: Vec<String>,
}

/// Flattens centers into one appointment per session with free capacity.
pub fn appointments_from_centers(centers: Vec<Center>) -> Vec<Appointment> {
    let mut appointments = Vec::new();
    for center in centers {
        for session in &center.sessions {
            if session.available_capacity <= 0 {
                continue;
            }
            appointments.push(Appointment {
                center_id: center.center_id,
                center_name: center.name.clone(),
                address: center.address.clone(),
                state: center.state_name.clone(),
                district: center.district_name.clone(),
                block: center.block_name.clone(),
                pincode: center.pincode,
                from: center.from.clone(),
                to: center.to.clone(),
                fee: center.fee_type.clone(),
                date: session.date.clone(),
                available_capacity: session.available_capacity,
                min_age_18: session.min_age_limit == 18,
                min_age_45: session.min_age_limit == 45,
                for_all: session.min_age_limit == 0,
                vaccine: session.vaccine.clone(),
                slots: session.slots.clone(),
            });
        }
    }
    appointments
}

/// Thin client over the CoWIN endpoints.
#[derive(Clone, Debug)]
pub struct CowinClient {
    client: reqwest::Client,
    base_url: String,
}

impl CowinClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Lists every state with its id.
    pub async fn list_states(&self) -> Result<Vec<State>, SourceError> {
        let response: StatesResponse = self
            .get_json(&format!("{}/v2/admin/location/states", self.base_url), &[])
            .await?;
        Ok(response.states)
    }

    /// Lists the districts of a state. A state without districts is treated as
    /// an unknown state id.
    pub async fn list_districts(&self, state_id: u32) -> Result<Vec<District>, SourceError> {
        let url = format!("{}/v2/admin/location/districts/{}", self.base_url, state_id);
        let response: DistrictsResponse = self.get_json(&url, &[]).await?;
        if response.districts.is_empty() {
            return Err(SourceError::InvalidState(state_id));
        }
        Ok(response.districts)
    }

    /// Fetches the week's calendar of centers for a district, starting at `date`
    /// (`dd-mm-YYYY`).
    pub async fn calendar_by_district(
        &self,
        district_id: u32,
        date: &str,
    ) -> Result<Vec<Center>, SourceError> {
        let url = format!(
            "{}/v2/appointment/sessions/public/calendarByDistrict",
            self.base_url
        );
        let district_id = district_id.to_string();
        let response: CentersResponse = self
            .get_json(&url, &[("district_id", district_id.as_str()), ("date", date)])
            .await?;
        Ok(response.centers)
    }

    /// Open appointments in a district starting at `date`.
    #[instrument(level = "debug", skip(self))]
    pub async fn appointments_for_district(
        &self,
        district_id: u32,
        date: &str,
    ) -> Result<Vec<Appointment>, SourceError> {
        let centers = self.calendar_by_district(district_id, date).await?;
        debug!(centers = centers.len(), "Calendar fetched.");
        Ok(appointments_from_centers(centers))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

/// Polls a fixed list of districts, one concurrent request per district.
pub struct CowinSource {
    districts: Vec<u32>,
    base_url: String,
    http: HttpConfig,
    client: OnceCell<CowinClient>,
}

impl CowinSource {
    pub fn new(districts: Vec<u32>, config: &CowinConfig, http: &HttpConfig) -> Self {
        Self {
            districts,
            base_url: config.base_url.clone(),
            http: http.clone(),
            client: OnceCell::new(),
        }
    }
}

#[async_trait]
impl SlotSource for CowinSource {
    fn name(&self) -> &str {
        "cowin"
    }

    /// Checks that districts are configured and builds the HTTP client on
    /// first use.
    async fn initialize(&self) -> Result<(), SourceError> {
        if self.districts.is_empty() {
            return Err(SourceError::Configuration(
                "no districts configured".to_string(),
            ));
        }
        self.client
            .get_or_try_init(|| async {
                let client = build_client(&self.http)?;
                Ok::<_, SourceError>(CowinClient::new(client, &self.base_url))
            })
            .await?;
        Ok(())
    }

    async fn fetch_all(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Vec<Appointment>, SourceError> {
        let client = self
            .client
            .get()
            .cloned()
            .ok_or_else(|| SourceError::Configuration("source is not initialized".to_string()))?;
        let date = Local::now().format(DATE_FORMAT).to_string();
        debug!(districts = ?self.districts, %date, "Fetching appointments.");

        fan_in(
            &self.districts,
            move |district_id| {
                let client = client.clone();
                let date = date.clone();
                async move { client.appointments_for_district(district_id, &date).await }
            },
            shutdown_rx,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn centers_body(name: &str, capacities: &[i64]) -> serde_json::Value {
        let sessions: Vec<_> = capacities
            .iter()
            .enumerate()
            .map(|(i, capacity)| {
                json!({
                    "session_id": format!("s-{i}"),
                    "date": "10-05-2021",
                    "available_capacity": capacity,
                    "min_age_limit": 18,
                    "vaccine": "COVAXIN",
                    "slots": ["09:00AM-11:00AM"]
                })
            })
            .collect();
        json!({
            "centers": [{
                "center_id": 1234,
                "name": name,
                "address": "Main Road",
                "state_name": "Maharashtra",
                "district_name": "Pune",
                "block_name": "Haveli",
                "pincode": 411001,
                "from": "09:00:00",
                "to": "18:00:00",
                "fee_type": "Free",
                "sessions": sessions
            }]
        })
    }

    #[test]
    fn test_sessions_without_capacity_are_skipped() {
        let centers: CentersResponse =
            serde_json::from_value(centers_body("PHC Wagholi", &[0, -1, 5])).unwrap();
        let appointments = appointments_from_centers(centers.centers);

        assert_eq!(appointments.len(), 1);
        let appointment = &appointments[0];
        assert_eq!(appointment.center_name, "PHC Wagholi");
        assert_eq!(appointment.available_capacity, 5);
        assert_eq!(appointment.district, "Pune");
        assert_eq!(appointment.state, "Maharashtra");
        assert!(appointment.min_age_18);
        assert!(!appointment.min_age_45);
    }

    #[test]
    fn test_missing_fields_default() {
        let centers: CentersResponse =
            serde_json::from_value(json!({ "centers": [{ "name": "Bare" }] })).unwrap();
        assert_eq!(centers.centers[0].name, "Bare");
        assert!(centers.centers[0].sessions.is_empty());

        let empty: CentersResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.centers.is_empty());
    }

    #[tokio::test]
    async fn test_calendar_by_district_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/appointment/sessions/public/calendarByDistrict"))
            .and(query_param("district_id", "363"))
            .and(query_param("date", "10-05-2021"))
            .respond_with(ResponseTemplate::new(200).set_body_json(centers_body("SGH", &[3])))
            .expect(1)
            .mount(&server)
            .await;

        let client = CowinClient::new(reqwest::Client::new(), &server.uri());
        let appointments = client
            .appointments_for_district(363, "10-05-2021")
            .await
            .unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].center_name, "SGH");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = CowinClient::new(reqwest::Client::new(), &server.uri());
        let err = client.calendar_by_district(1, "10-05-2021").await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status, .. } if status.as_u16() == 403));
    }

    #[tokio::test]
    async fn test_list_states_and_districts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/admin/location/states"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "states": [{ "state_id": 21, "state_name": "Maharashtra" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/admin/location/districts/21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "districts": [{ "district_id": 363, "district_name": "Pune" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/admin/location/districts/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "districts": [] })))
            .mount(&server)
            .await;

        let client = CowinClient::new(reqwest::Client::new(), &format!("{}/", server.uri()));
        let states = client.list_states().await.unwrap();
        assert_eq!(states, vec![State { state_id: 21, state_name: "Maharashtra".to_string() }]);

        let districts = client.list_districts(21).await.unwrap();
        assert_eq!(districts[0].district_id, 363);

        let err = client.list_districts(99).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidState(99)));
    }

    #[tokio::test]
    async fn test_source_requires_districts() {
        let source = CowinSource::new(vec![], &CowinConfig::default(), &HttpConfig::default());
        assert!(matches!(
            source.initialize().await,
            Err(SourceError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_before_initialize_fails() {
        let source = CowinSource::new(vec![1], &CowinConfig::default(), &HttpConfig::default());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        assert!(matches!(
            source.fetch_all(shutdown_rx).await,
            Err(SourceError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_merges_districts_and_absorbs_failures() {
        let server = MockServer::start().await;
        for (district, name, capacities) in [("1", "North", &[2, 0][..]), ("2", "South", &[4, 7][..])] {
            Mock::given(method("GET"))
                .and(path("/v2/appointment/sessions/public/calendarByDistrict"))
                .and(query_param("district_id", district))
                .respond_with(ResponseTemplate::new(200).set_body_json(centers_body(name, capacities)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/v2/appointment/sessions/public/calendarByDistrict"))
            .and(query_param("district_id", "3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = CowinConfig {
            base_url: server.uri(),
            ..CowinConfig::default()
        };
        let source = CowinSource::new(vec![1, 2, 3], &config, &HttpConfig::default());
        source.initialize().await.unwrap();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let appointments = source.fetch_all(shutdown_rx).await.unwrap();

        assert_eq!(appointments.len(), 3);
        assert_eq!(appointments.iter().filter(|a| a.center_name == "North").count(), 1);
        assert_eq!(appointments.iter().filter(|a| a.center_name == "South").count(), 2);
    }
}
