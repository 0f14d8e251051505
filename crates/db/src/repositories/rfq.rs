use rfqdesk_core::domain::material::{
    MaterialLine, MaterialLineId, MaterialRef, MaterialStatus, MaterialStatusChange,
};
use rfqdesk_core::domain::party::{ProjectId, SupplierId};
use rfqdesk_core::domain::rfq::{Rfq, RfqId, RfqNumber, RfqStatus};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use super::{encode_timestamp, parse_date, parse_decimal, parse_rfc3339, RepositoryError, RfqRepository};
use crate::DbPool;

const RFQ_COLUMNS: &str = "id, number, project_id, delivery_location, bidding_start, bidding_end,
    delivery_date, terms, status, version, created_at, updated_at";

#[derive(Clone, Debug, PartialEq, Eq)]
struct RfqRecord {
    id: String,
    number: i64,
    project_id: String,
    delivery_location: String,
    bidding_start: Option<String>,
    bidding_end: Option<String>,
    delivery_date: Option<String>,
    terms: String,
    status: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct MaterialLineRecord {
    id: String,
    material_id: Option<String>,
    name: String,
    unit: String,
    hsn_code: Option<String>,
    quantity: String,
    delivery_date: Option<String>,
    status: String,
}

impl TryFrom<MaterialLineRecord> for MaterialLine {
    type Error = RepositoryError;

    fn try_from(value: MaterialLineRecord) -> Result<Self, Self::Error> {
        let status = MaterialStatus::parse(&value.status).ok_or_else(|| {
            RepositoryError::Decode(format!("invalid material line status: {}", value.status))
        })?;

        Ok(Self {
            quantity: parse_decimal("material line quantity", &value.quantity)?,
            delivery_date: parse_date("material line delivery_date", value.delivery_date.as_deref())?,
            id: MaterialLineId(value.id),
            material: MaterialRef {
                material_id: value.material_id,
                name: value.name,
                unit: value.unit,
                hsn_code: value.hsn_code,
            },
            status,
        })
    }
}

impl RfqRecord {
    fn into_rfq(
        self,
        supplier_ids: Vec<SupplierId>,
        materials: Vec<MaterialLine>,
    ) -> Result<Rfq, RepositoryError> {
        let status = RfqStatus::parse(&self.status)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid rfq status: {}", self.status)))?;
        let number = u32::try_from(self.number)
            .map_err(|_| RepositoryError::Decode(format!("invalid rfq number: {}", self.number)))?;
        let version = u32::try_from(self.version)
            .map_err(|_| RepositoryError::Decode(format!("invalid rfq version: {}", self.version)))?;

        Ok(Rfq {
            number: RfqNumber(number),
            project_id: ProjectId(self.project_id),
            delivery_location: self.delivery_location,
            bidding_start: parse_date("rfq bidding_start", self.bidding_start.as_deref())?,
            bidding_end: parse_date("rfq bidding_end", self.bidding_end.as_deref())?,
            delivery_date: parse_date("rfq delivery_date", self.delivery_date.as_deref())?,
            terms: self.terms,
            supplier_ids,
            materials,
            status,
            version,
            created_at: parse_rfc3339("rfq created_at", &self.created_at)?,
            updated_at: parse_rfc3339("rfq updated_at", &self.updated_at)?,
            id: RfqId(self.id),
        })
    }
}

pub struct SqlRfqRepository {
    pool: DbPool,
}

impl SqlRfqRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, record: RfqRecord) -> Result<Rfq, RepositoryError> {
        let supplier_ids = sqlx::query_scalar::<_, String>(
            "SELECT supplier_id FROM rfq_supplier WHERE rfq_id = ? ORDER BY position ASC",
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SupplierId)
        .collect();

        let materials = sqlx::query(
            "SELECT id, material_id, name, unit, hsn_code, quantity, delivery_date, status
             FROM material_line
             WHERE rfq_id = ?
             ORDER BY position ASC",
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| MaterialLine::try_from(material_line_record_from_row(row)?))
        .collect::<Result<Vec<_>, _>>()?;

        record.into_rfq(supplier_ids, materials)
    }

    async fn hydrate_all(&self, rows: Vec<SqliteRow>) -> Result<Vec<Rfq>, RepositoryError> {
        let mut rfqs = Vec::with_capacity(rows.len());
        for row in &rows {
            rfqs.push(self.hydrate(rfq_record_from_row(row)?).await?);
        }
        Ok(rfqs)
    }

    async fn write_guarded(
        conn: &mut SqliteConnection,
        mut rfq: Rfq,
        expected_version: u32,
    ) -> Result<Rfq, RepositoryError> {
        let next_version = expected_version + 1;
        let updated = sqlx::query(
            "UPDATE rfq SET
                project_id = ?,
                delivery_location = ?,
                bidding_start = ?,
                bidding_end = ?,
                delivery_date = ?,
                terms = ?,
                status = ?,
                version = ?,
                updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&rfq.project_id.0)
        .bind(&rfq.delivery_location)
        .bind(rfq.bidding_start.map(|date| date.to_string()))
        .bind(rfq.bidding_end.map(|date| date.to_string()))
        .bind(rfq.delivery_date.map(|date| date.to_string()))
        .bind(&rfq.terms)
        .bind(rfq.status.as_str())
        .bind(i64::from(next_version))
        .bind(encode_timestamp(rfq.updated_at))
        .bind(&rfq.id.0)
        .bind(i64::from(expected_version))
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::Conflict { entity: "rfq", id: rfq.id.0 });
        }

        write_children(conn, &rfq).await?;
        rfq.version = next_version;
        Ok(rfq)
    }
}

#[async_trait::async_trait]
impl RfqRepository for SqlRfqRepository {
    async fn create(&self, mut rfq: Rfq) -> Result<Rfq, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let number: i64 = sqlx::query_scalar(
            "INSERT INTO rfq (
                id,
                number,
                project_id,
                delivery_location,
                bidding_start,
                bidding_end,
                delivery_date,
                terms,
                status,
                version,
                created_at,
                updated_at
             ) VALUES (?, (SELECT COALESCE(MAX(number), 0) + 1 FROM rfq), ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
             RETURNING number",
        )
        .bind(&rfq.id.0)
        .bind(&rfq.project_id.0)
        .bind(&rfq.delivery_location)
        .bind(rfq.bidding_start.map(|date| date.to_string()))
        .bind(rfq.bidding_end.map(|date| date.to_string()))
        .bind(rfq.delivery_date.map(|date| date.to_string()))
        .bind(&rfq.terms)
        .bind(rfq.status.as_str())
        .bind(encode_timestamp(rfq.created_at))
        .bind(encode_timestamp(rfq.updated_at))
        .fetch_one(&mut *tx)
        .await?;

        write_children(&mut tx, &rfq).await?;
        tx.commit().await?;

        rfq.number = RfqNumber(
            u32::try_from(number)
                .map_err(|_| RepositoryError::Decode(format!("invalid rfq number: {number}")))?,
        );
        rfq.version = 1;
        Ok(rfq)
    }

    async fn find_by_id(&self, id: &RfqId) -> Result<Option<Rfq>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {RFQ_COLUMNS} FROM rfq WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(rfq_record_from_row(&row)?).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_project(&self, project_id: &ProjectId) -> Result<Vec<Rfq>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RFQ_COLUMNS} FROM rfq WHERE project_id = ? ORDER BY number ASC"
        ))
        .bind(&project_id.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }

    async fn list_all(&self) -> Result<Vec<Rfq>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {RFQ_COLUMNS} FROM rfq ORDER BY number ASC"))
            .fetch_all(&self.pool)
            .await?;

        self.hydrate_all(rows).await
    }

    async fn save(&self, rfq: Rfq, expected_version: u32) -> Result<Rfq, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let saved = Self::write_guarded(&mut tx, rfq, expected_version).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn save_with_status_change(
        &self,
        rfq: Rfq,
        expected_version: u32,
        change: MaterialStatusChange,
    ) -> Result<Rfq, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let saved = Self::write_guarded(&mut tx, rfq, expected_version).await?;

        sqlx::query(
            "INSERT INTO material_status_change (
                rfq_id,
                line_id,
                from_status,
                to_status,
                actor,
                changed_at
             ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&change.rfq_id.0)
        .bind(&change.line_id.0)
        .bind(change.from.as_str())
        .bind(change.to.as_str())
        .bind(&change.actor)
        .bind(encode_timestamp(change.changed_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn delete(&self, id: &RfqId) -> Result<bool, RepositoryError> {
        let deleted =
            sqlx::query("DELETE FROM rfq WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn list_status_history(
        &self,
        line_id: &MaterialLineId,
    ) -> Result<Vec<MaterialStatusChange>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT rfq_id, line_id, from_status, to_status, actor, changed_at
             FROM material_status_change
             WHERE line_id = ?
             ORDER BY id ASC",
        )
        .bind(&line_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_change_from_row).collect()
    }
}

async fn write_children(conn: &mut SqliteConnection, rfq: &Rfq) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM rfq_supplier WHERE rfq_id = ?")
        .bind(&rfq.id.0)
        .execute(&mut *conn)
        .await?;
    for (position, supplier_id) in rfq.supplier_ids.iter().enumerate() {
        sqlx::query("INSERT INTO rfq_supplier (rfq_id, supplier_id, position) VALUES (?, ?, ?)")
            .bind(&rfq.id.0)
            .bind(&supplier_id.0)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("DELETE FROM material_line WHERE rfq_id = ?")
        .bind(&rfq.id.0)
        .execute(&mut *conn)
        .await?;
    for (position, line) in rfq.materials.iter().enumerate() {
        sqlx::query(
            "INSERT INTO material_line (
                id,
                rfq_id,
                position,
                material_id,
                name,
                unit,
                hsn_code,
                quantity,
                delivery_date,
                status
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&line.id.0)
        .bind(&rfq.id.0)
        .bind(position as i64)
        .bind(line.material.material_id.as_deref())
        .bind(&line.material.name)
        .bind(&line.material.unit)
        .bind(line.material.hsn_code.as_deref())
        .bind(line.quantity.to_string())
        .bind(line.delivery_date.map(|date| date.to_string()))
        .bind(line.status.as_str())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn rfq_record_from_row(row: &SqliteRow) -> Result<RfqRecord, RepositoryError> {
    Ok(RfqRecord {
        id: row.try_get("id")?,
        number: row.try_get("number")?,
        project_id: row.try_get("project_id")?,
        delivery_location: row.try_get("delivery_location")?,
        bidding_start: row.try_get("bidding_start")?,
        bidding_end: row.try_get("bidding_end")?,
        delivery_date: row.try_get("delivery_date")?,
        terms: row.try_get("terms")?,
        status: row.try_get("status")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn material_line_record_from_row(row: &SqliteRow) -> Result<MaterialLineRecord, RepositoryError> {
    Ok(MaterialLineRecord {
        id: row.try_get("id")?,
        material_id: row.try_get("material_id")?,
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
        hsn_code: row.try_get("hsn_code")?,
        quantity: row.try_get("quantity")?,
        delivery_date: row.try_get("delivery_date")?,
        status: row.try_get("status")?,
    })
}

fn status_change_from_row(row: &SqliteRow) -> Result<MaterialStatusChange, RepositoryError> {
    let from_raw: String = row.try_get("from_status")?;
    let to_raw: String = row.try_get("to_status")?;
    let parse = |raw: &str| {
        MaterialStatus::parse(raw)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid material status: {raw}")))
    };
    let changed_at: String = row.try_get("changed_at")?;

    Ok(MaterialStatusChange {
        rfq_id: RfqId(row.try_get("rfq_id")?),
        line_id: MaterialLineId(row.try_get("line_id")?),
        from: parse(&from_raw)?,
        to: parse(&to_raw)?,
        actor: row.try_get("actor")?,
        changed_at: parse_rfc3339("status change changed_at", &changed_at)?,
    })
}
