mod test_llm_check;
mod test_setup;
