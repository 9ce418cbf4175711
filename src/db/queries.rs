use crate::models::{
    DerivedFields, ExitCauseInput, ExitCauseRow, LedgerRecord, LegacyRecord, NewLedgerRecord,
    NewPartner, NewSale, Partner, SaleRow,
};
use sqlx::PgPool;

/// 查询全部台账记录 (日期倒序)
pub async fn list_records(pool: &PgPool) -> Result<Vec<LedgerRecord>, sqlx::Error> {
    sqlx::query_as::<_, LedgerRecord>(
        r#"
        SELECT id, socio_id AS partner_id, fecha AS date,
               entradas AS entries, salidas AS exits, saldo AS balance,
               kg_totales AS total_weight, vr_kilo AS price_per_kilo,
               fletes AS freight_cost, comision AS commission,
               valor_animal AS per_animal_value, total,
               created_at, updated_at
        FROM registros_ganaderos
        ORDER BY fecha DESC, id DESC
        "#
    )
    .fetch_all(pool)
    .await
}

/// 查询某社员的台账记录
pub async fn list_records_by_partner(
    pool: &PgPool,
    partner_id: i64,
) -> Result<Vec<LedgerRecord>, sqlx::Error> {
    sqlx::query_as::<_, LedgerRecord>(
        r#"
        SELECT id, socio_id AS partner_id, fecha AS date,
               entradas AS entries, salidas AS exits, saldo AS balance,
               kg_totales AS total_weight, vr_kilo AS price_per_kilo,
               fletes AS freight_cost, comision AS commission,
               valor_animal AS per_animal_value, total,
               created_at, updated_at
        FROM registros_ganaderos
        WHERE socio_id = $1
        ORDER BY fecha DESC, id DESC
        "#
    )
    .bind(partner_id)
    .fetch_all(pool)
    .await
}

/// 按 ID 查询单条记录
pub async fn get_record(pool: &PgPool, id: i64) -> Result<Option<LedgerRecord>, sqlx::Error> {
    sqlx::query_as::<_, LedgerRecord>(
        r#"
        SELECT id, socio_id AS partner_id, fecha AS date,
               entradas AS entries, salidas AS exits, saldo AS balance,
               kg_totales AS total_weight, vr_kilo AS price_per_kilo,
               fletes AS freight_cost, comision AS commission,
               valor_animal AS per_animal_value, total,
               created_at, updated_at
        FROM registros_ganaderos
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// 插入新记录 (原始字段 + 预览阶段的派生字段)
///
/// `legacy_id` 仅在从旧表导入时给出, 唯一约束保证同一旧表行不会重复导入。
pub async fn insert_record(
    pool: &PgPool,
    record: &NewLedgerRecord,
    derived: &DerivedFields,
    legacy_id: Option<i64>,
) -> Result<LedgerRecord, sqlx::Error> {
    sqlx::query_as::<_, LedgerRecord>(
        r#"
        INSERT INTO registros_ganaderos (
            socio_id, fecha, entradas, salidas, saldo,
            kg_totales, vr_kilo, fletes, comision, valor_animal, total,
            registro_legado_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id, socio_id AS partner_id, fecha AS date,
                  entradas AS entries, salidas AS exits, saldo AS balance,
                  kg_totales AS total_weight, vr_kilo AS price_per_kilo,
                  fletes AS freight_cost, comision AS commission,
                  valor_animal AS per_animal_value, total,
                  created_at, updated_at
        "#
    )
    .bind(record.partner_id)
    .bind(record.date)
    .bind(record.entries)
    .bind(record.exits)
    .bind(derived.balance)
    .bind(&record.total_weight)
    .bind(&record.price_per_kilo)
    .bind(&record.freight_cost)
    .bind(&record.commission)
    .bind(&derived.per_animal_value)
    .bind(&derived.total)
    .bind(legacy_id)
    .fetch_one(pool)
    .await
}

/// 已导入的旧表行 ID
pub async fn list_imported_legacy_ids(pool: &PgPool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT registro_legado_id
        FROM registros_ganaderos
        WHERE registro_legado_id IS NOT NULL
        "#
    )
    .fetch_all(pool)
    .await
}

/// 覆盖原始字段, 派生字段留给重算
pub async fn update_record(
    pool: &PgPool,
    id: i64,
    record: &NewLedgerRecord,
) -> Result<Option<LedgerRecord>, sqlx::Error> {
    sqlx::query_as::<_, LedgerRecord>(
        r#"
        UPDATE registros_ganaderos
        SET socio_id = $2, fecha = $3, entradas = $4, salidas = $5,
            kg_totales = $6, vr_kilo = $7, fletes = $8, comision = $9,
            updated_at = now()
        WHERE id = $1
        RETURNING id, socio_id AS partner_id, fecha AS date,
                  entradas AS entries, salidas AS exits, saldo AS balance,
                  kg_totales AS total_weight, vr_kilo AS price_per_kilo,
                  fletes AS freight_cost, comision AS commission,
                  valor_animal AS per_animal_value, total,
                  created_at, updated_at
        "#
    )
    .bind(id)
    .bind(record.partner_id)
    .bind(record.date)
    .bind(record.entries)
    .bind(record.exits)
    .bind(&record.total_weight)
    .bind(&record.price_per_kilo)
    .bind(&record.freight_cost)
    .bind(&record.commission)
    .fetch_optional(pool)
    .await
}

/// 回写派生字段, 返回影响行数
pub async fn update_derived_fields(
    pool: &PgPool,
    id: i64,
    derived: &DerivedFields,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE registros_ganaderos
        SET saldo = $2, total = $3, valor_animal = $4, updated_at = now()
        WHERE id = $1
        "#
    )
    .bind(id)
    .bind(derived.balance)
    .bind(&derived.total)
    .bind(&derived.per_animal_value)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// 批量插入出栏明细
pub async fn insert_exit_causes(
    pool: &PgPool,
    record_id: i64,
    entries: &[ExitCauseInput],
) -> Result<(), sqlx::Error> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut query_builder =
        sqlx::QueryBuilder::new("INSERT INTO salidas_detalle (registro_id, causa, cantidad) ");

    query_builder.push_values(entries, |mut b, entry| {
        b.push_bind(record_id)
            .push_bind(entry.cause.as_db_str())
            .push_bind(entry.quantity);
    });

    let result = query_builder.build().execute(pool).await?;
    tracing::debug!("Inserted {} exit causes for record {}", result.rows_affected(), record_id);
    Ok(())
}

/// 查询某条记录的出栏明细
pub async fn list_exit_causes(
    pool: &PgPool,
    record_id: i64,
) -> Result<Vec<ExitCauseRow>, sqlx::Error> {
    sqlx::query_as::<_, ExitCauseRow>(
        r#"
        SELECT id, registro_id AS record_id, causa AS cause, cantidad AS quantity, created_at
        FROM salidas_detalle
        WHERE registro_id = $1
        ORDER BY id
        "#
    )
    .bind(record_id)
    .fetch_all(pool)
    .await
}

/// 在用社员列表
pub async fn list_active_partners(pool: &PgPool) -> Result<Vec<Partner>, sqlx::Error> {
    sqlx::query_as::<_, Partner>(
        r#"
        SELECT id, nombre AS name, telefono AS phone, email, direccion AS address,
               activo AS active, created_at
        FROM socios
        WHERE activo = TRUE
        ORDER BY nombre
        "#
    )
    .fetch_all(pool)
    .await
}

pub async fn get_partner(pool: &PgPool, id: i64) -> Result<Option<Partner>, sqlx::Error> {
    sqlx::query_as::<_, Partner>(
        r#"
        SELECT id, nombre AS name, telefono AS phone, email, direccion AS address,
               activo AS active, created_at
        FROM socios
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// 按名称查找在用社员 (名称已规范化为大写)
pub async fn find_partner_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<Partner>, sqlx::Error> {
    sqlx::query_as::<_, Partner>(
        r#"
        SELECT id, nombre AS name, telefono AS phone, email, direccion AS address,
               activo AS active, created_at
        FROM socios
        WHERE nombre = $1 AND activo = TRUE
        "#
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn insert_partner(pool: &PgPool, partner: &NewPartner) -> Result<Partner, sqlx::Error> {
    sqlx::query_as::<_, Partner>(
        r#"
        INSERT INTO socios (nombre, telefono, email, direccion, activo)
        VALUES ($1, $2, $3, $4, TRUE)
        RETURNING id, nombre AS name, telefono AS phone, email, direccion AS address,
                  activo AS active, created_at
        "#
    )
    .bind(&partner.name)
    .bind(&partner.phone)
    .bind(&partner.email)
    .bind(&partner.address)
    .fetch_one(pool)
    .await
}

/// 插入销售登记
pub async fn insert_sale(pool: &PgPool, sale: &NewSale) -> Result<SaleRow, sqlx::Error> {
    sqlx::query_as::<_, SaleRow>(
        r#"
        INSERT INTO ventas (
            socio_id, registro_id, fecha, cantidad, tipo,
            valor_kilo, total_kilos, valor_total
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, socio_id AS partner_id, registro_id AS record_id, fecha AS date,
                  cantidad AS quantity, tipo AS kind, valor_kilo AS price_per_kilo,
                  total_kilos, valor_total AS total_value, created_at
        "#
    )
    .bind(sale.partner_id)
    .bind(sale.record_id)
    .bind(sale.date)
    .bind(sale.quantity)
    .bind(sale.kind.as_db_str())
    .bind(&sale.price_per_kilo)
    .bind(&sale.total_kilos)
    .bind(sale.total_value())
    .fetch_one(pool)
    .await
}

pub async fn list_sales_by_partner(
    pool: &PgPool,
    partner_id: i64,
) -> Result<Vec<SaleRow>, sqlx::Error> {
    sqlx::query_as::<_, SaleRow>(
        r#"
        SELECT id, socio_id AS partner_id, registro_id AS record_id, fecha AS date,
               cantidad AS quantity, tipo AS kind, valor_kilo AS price_per_kilo,
               total_kilos, valor_total AS total_value, created_at
        FROM ventas
        WHERE socio_id = $1
        ORDER BY fecha DESC, id DESC
        "#
    )
    .bind(partner_id)
    .fetch_all(pool)
    .await
}

/// 读取旧表 registros (社员以名称关联, 数值列可能为空)
pub async fn list_legacy_records(pool: &PgPool) -> Result<Vec<LegacyRecord>, sqlx::Error> {
    sqlx::query_as::<_, LegacyRecord>(
        r#"
        SELECT id, socio AS partner_name, fecha AS date,
               COALESCE(entradas, 0) AS entries,
               COALESCE(salidas, 0) AS exits,
               COALESCE(kg_totales, 0) AS total_weight,
               COALESCE(vr_kilo, 0) AS price_per_kilo,
               COALESCE(fletes, 0) AS freight_cost,
               COALESCE(comision, 0) AS commission
        FROM registros
        ORDER BY fecha, id
        "#
    )
    .fetch_all(pool)
    .await
}
