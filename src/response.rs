use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct List<T> {
    list: Vec<T>,
    total: i64,
}

impl<T> List<T> {
    pub fn new(list: Vec<T>) -> Self {
        let total = list.len() as i64;
        List { list, total }
    }
}
