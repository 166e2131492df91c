use sea_orm::{
    Condition, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QuerySelect, Select,
};

/// Supplies the base collection of a view.
pub trait CollectionProvider<E: EntityTrait>: Send + Sync {
    fn collection(&self) -> Select<E>;
}

impl<E, F> CollectionProvider<E> for F
where
    E: EntityTrait,
    F: Fn() -> Select<E> + Send + Sync,
{
    fn collection(&self) -> Select<E> {
        self()
    }
}

/// A lazily evaluated collection, or the "no results" sentinel.
#[derive(Debug, Clone)]
pub enum Collection<E: EntityTrait> {
    Query(Select<E>),
    Empty,
}

impl<E> Collection<E>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    pub fn filter(self, condition: Condition) -> Self {
        match self {
            Collection::Query(select) => Collection::Query(select.filter(condition)),
            Collection::Empty => Collection::Empty,
        }
    }

    pub fn is_empty_sentinel(&self) -> bool {
        matches!(self, Collection::Empty)
    }

    pub async fn count<C: ConnectionTrait>(&self, db: &C) -> Result<u64, DbErr> {
        match self {
            Collection::Query(select) => select.clone().count(db).await,
            Collection::Empty => Ok(0),
        }
    }

    /// Fetch `limit` rows starting at `offset`; `None` fetches everything.
    pub async fn fetch<C: ConnectionTrait>(
        &self,
        db: &C,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<E::Model>, DbErr> {
        match self {
            Collection::Query(select) => {
                let mut select = select.clone();
                if offset > 0 {
                    select = select.offset(offset);
                }
                if let Some(limit) = limit {
                    select = select.limit(limit);
                }
                select.all(db).await
            }
            Collection::Empty => Ok(Vec::new()),
        }
    }

    pub async fn one<C: ConnectionTrait>(&self, db: &C) -> Result<Option<E::Model>, DbErr> {
        match self {
            Collection::Query(select) => select.clone().one(db).await,
            Collection::Empty => Ok(None),
        }
    }
}
