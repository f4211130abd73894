use async_trait::async_trait;
use diesel::prelude::*;
use pgvector::{Vector, VectorExpressionMethods};

use crate::config::TenantContext;
use crate::domain::entities::RetrievedDocument;
use crate::domain::repositories::vector_repository::{
    SearchFilter, VectorRecord, VectorRepository, VectorRepositoryError,
};
use crate::infrastructure::database::models::{KnowledgeVectorModel, NewKnowledgeVectorModel};
use crate::infrastructure::database::schema::knowledge_vectors::dsl::*;
use crate::infrastructure::database::{DbConnection, DbPool, tenant_connection};

/// pgvector-backed implementation of the vector store contract. Distance
/// is computed in SQL (`<=>` cosine distance) and converted to similarity
/// so callers see plain cosine scores.
pub struct PgvectorStore {
    pool: DbPool,
    tenant: TenantContext,
    dimensions: usize,
}

impl PgvectorStore {
    pub fn new(pool: DbPool, tenant: TenantContext, dimensions: usize) -> Self {
        Self {
            pool,
            tenant,
            dimensions,
        }
    }

    fn conn(&self) -> Result<DbConnection, VectorRepositoryError> {
        tenant_connection(&self.pool, &self.tenant)
            .map_err(|e| VectorRepositoryError::DatabaseError(e.to_string()))
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), VectorRepositoryError> {
        if vector.len() != self.dimensions {
            return Err(VectorRepositoryError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorRepository for PgvectorStore {
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        limit: i64,
        filter: &SearchFilter,
    ) -> Result<Vec<(RetrievedDocument, f32)>, VectorRepositoryError> {
        self.check_dimensions(query_embedding)?;
        let mut conn = self.conn()?;

        let query_vector = Vector::from(query_embedding.to_vec());

        let mut query = knowledge_vectors
            .filter(chatbot_id.eq(&self.tenant.chatbot_id))
            .filter(embedding.is_not_null())
            .select((
                KnowledgeVectorModel::as_select(),
                embedding.cosine_distance(query_vector.clone()),
            ))
            .order(embedding.cosine_distance(query_vector))
            .limit(limit)
            .into_boxed();

        if filter.public_only {
            query = query.filter(is_public.eq(true).or(is_public.is_null()));
        }
        if let Some(wanted_type) = filter.doc_type {
            query = query.filter(doc_type.eq(wanted_type.as_str().to_string()));
        }
        if filter.exclude_conversation_uploads {
            query = query.filter(source.ne("chat_conversation").or(source.is_null()));
        }

        let rows: Vec<(KnowledgeVectorModel, Option<f64>)> = query
            .load(&mut conn)
            .map_err(|e| VectorRepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(model, distance)| {
                let score = 1.0 - distance? as f32;
                Some((model.into_document(score), score))
            })
            .collect())
    }

    async fn upsert(&self, record: &VectorRecord) -> Result<(), VectorRepositoryError> {
        self.check_dimensions(&record.embedding)?;
        let mut conn = self.conn()?;

        let new_vector = NewKnowledgeVectorModel::build(record, &self.tenant.chatbot_id);

        diesel::insert_into(knowledge_vectors)
            .values(&new_vector)
            .on_conflict(id)
            .do_update()
            .set(&new_vector)
            .execute(&mut conn)
            .map_err(|e| VectorRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
