mod test_classifier;
mod test_collector;
mod test_evaluation;
